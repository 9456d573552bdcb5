//! Session tokens and the watcher that signs users out once they expire.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RapportError, Result};

/// How often a started watcher looks at the stored tokens
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_CASHIER_NAME: &str = "Caissier";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserType {
    Cashier,
    Admin,
}

impl UserType {
    pub const ALL: [UserType; 2] = [UserType::Cashier, UserType::Admin];

    pub fn token_key(self) -> &'static str {
        match self {
            UserType::Cashier => "cashier_token",
            UserType::Admin => "admin_token",
        }
    }

    pub fn data_key(self) -> &'static str {
        match self {
            UserType::Cashier => "cashier_data",
            UserType::Admin => "admin_data",
        }
    }

    pub fn login_route(self) -> &'static str {
        match self {
            UserType::Cashier => "/login",
            UserType::Admin => "/admin-login-xyz",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            UserType::Cashier => "cashier",
            UserType::Admin => "admin",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashier_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Decode the claims segment of a JWT. The signature is not checked.
pub fn decode_payload(token: &str) -> Result<TokenPayload> {
    let segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| RapportError::MalformedToken("expected three dot-separated parts".into()))?;
    let segment = segment.trim_end_matches('=');

    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD_NO_PAD.decode(segment))
        .map_err(|e| RapportError::MalformedToken(e.to_string()))?;

    serde_json::from_slice(&raw).map_err(|e| RapportError::MalformedToken(e.to_string()))
}

/// Key/value storage the tokens live in
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Tokens persisted in `session.toml` inside the config directory
#[derive(Debug)]
pub struct SessionFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| RapportError::ConfigParse {
            path: self.path.clone(),
            source: e,
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = toml::to_string_pretty(entries).map_err(|e| {
            RapportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }
}

/// Write a file only its owner can read, tightening an existing one
#[cfg(unix)]
fn write_private(path: &std::path::Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &std::path::Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, content)
}

impl TokenStore for SessionFile {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match self.load() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                warn!("could not read {}: {e}", self.path.display());
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

pub trait Clock: Send + Sync {
    /// Seconds since the epoch
    fn now_secs(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    Expired,
    Logout,
}

type SignOutHandler = Box<dyn Fn(UserType, SignOutReason) + Send + Sync>;

struct Inner {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    on_sign_out: SignOutHandler,
}

impl Inner {
    fn payload(&self, user: UserType) -> Option<Result<TokenPayload>> {
        self.store
            .get(user.token_key())
            .map(|token| decode_payload(&token))
    }

    /// Expired or undecodable; an absent token is not expired.
    fn is_expired(&self, user: UserType) -> bool {
        match self.payload(user) {
            None => false,
            Some(Ok(payload)) => payload.exp <= self.clock.now_secs(),
            Some(Err(e)) => {
                warn!("{user} token could not be decoded: {e}");
                true
            }
        }
    }

    fn sign_out(&self, user: UserType, reason: SignOutReason) -> Result<()> {
        self.store.remove(user.token_key())?;
        self.store.remove(user.data_key())?;
        (self.on_sign_out)(user, reason);
        Ok(())
    }

    fn check(&self) -> Vec<UserType> {
        let mut expired = Vec::new();
        for user in UserType::ALL {
            if !self.is_expired(user) {
                continue;
            }
            warn!(
                "{user} token expired, sign in again at {}",
                user.login_route()
            );
            match self.sign_out(user, SignOutReason::Expired) {
                Ok(()) => expired.push(user),
                Err(e) => warn!("could not clear {user} session: {e}"),
            }
        }
        expired
    }
}

struct Timer {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Watches stored tokens and signs users out when theirs expire.
///
/// Construct one per application and pass it to whoever needs it; each
/// instance owns its own timer.
pub struct ExpiryWatcher {
    inner: Arc<Inner>,
    timer: Mutex<Option<Timer>>,
}

impl ExpiryWatcher {
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_handler(store, clock, |_, _| {})
    }

    /// `on_sign_out` runs after a user's tokens have been cleared
    pub fn with_handler<F>(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, on_sign_out: F) -> Self
    where
        F: Fn(UserType, SignOutReason) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                on_sign_out: Box::new(on_sign_out),
            }),
            timer: Mutex::new(None),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<Timer>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check every `interval` on a background thread until [`stop`](Self::stop).
    /// Starting a running watcher does nothing.
    pub fn start(&self, interval: Duration) {
        let mut timer = self.timer();
        if timer.is_some() {
            return;
        }

        let (stop, rx) = mpsc::channel::<()>();
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::spawn(move || loop {
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    inner.check();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        debug!(?interval, "token expiry watcher started");
        *timer = Some(Timer { stop, handle });
    }

    pub fn stop(&self) {
        let Some(timer) = self.timer().take() else {
            return;
        };
        let _ = timer.stop.send(());
        if timer.handle.join().is_err() {
            warn!("token expiry watcher thread panicked");
        }
        debug!("token expiry watcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.timer().is_some()
    }

    /// Check both sessions immediately; returns the users signed out.
    pub fn check_now(&self) -> Vec<UserType> {
        self.inner.check()
    }

    /// Decode and store a freshly issued token
    pub fn sign_in(&self, user: UserType, token: &str) -> Result<TokenPayload> {
        let payload = decode_payload(token)?;
        let data = serde_json::to_string(&payload)
            .map_err(|e| RapportError::MalformedToken(e.to_string()))?;
        self.inner.store.set(user.token_key(), token)?;
        self.inner.store.set(user.data_key(), &data)?;
        Ok(payload)
    }

    pub fn logout(&self, user: UserType) -> Result<()> {
        self.inner.sign_out(user, SignOutReason::Logout)
    }

    pub fn is_token_valid(&self, user: UserType) -> bool {
        !self.inner.is_expired(user)
    }

    pub fn is_authenticated(&self, user: UserType) -> bool {
        self.inner.store.get(user.token_key()).is_some() && self.is_token_valid(user)
    }

    pub fn token(&self, user: UserType) -> Option<String> {
        self.inner.store.get(user.token_key())
    }

    pub fn token_payload(&self, user: UserType) -> Option<TokenPayload> {
        match self.inner.payload(user)? {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("{user} token could not be decoded: {e}");
                None
            }
        }
    }

    /// Seconds left on the token, clamped at 0; -1 when there is none
    pub fn time_until_expiration(&self, user: UserType) -> i64 {
        match self.token_payload(user) {
            Some(payload) => (payload.exp - self.inner.clock.now_secs()).max(0),
            None => -1,
        }
    }

    /// Name of the signed-in cashier, `Caissier` when unknown
    pub fn cashier_name(&self) -> String {
        self.token_payload(UserType::Cashier)
            .and_then(|p| p.username)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_CASHIER_NAME.to_string())
    }

    pub fn cashier_id(&self) -> Option<String> {
        self.token_payload(UserType::Cashier)
            .and_then(|p| p.cashier_id)
            .filter(|id| !id.is_empty())
    }
}

impl Drop for ExpiryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
