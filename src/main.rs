use chrono::{DateTime, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use rapport::auth::{self, Clock, SignOutReason, SystemClock, TokenStore, UserType};
use rapport::backend::{
    BackendClient, CategoryDraft, DateFilter, ExpenseCategory, ExpenseDraft, ExpenseFilter,
    Restock, RestockItem,
};
use rapport::cart::{Cart, Product, Receipt};
use rapport::config::{self, Config};
use rapport::error::{RapportError, Result};
use rapport::output::{RenderedReport, SystemHost};
use rapport::pdf::TypstRenderer;
use rapport::report::{
    format_currency, format_date, format_local_date_time, Document, ExpenseItem, GameSessionItem,
    PartialReportConfig, ReportConfig, ReportGenerator, ReportKind, Statistics,
};
use rapport::ExpiryWatcher;

#[derive(Parser)]
#[command(name = "rapport")]
#[command(version, about = "Restaurant back-office reports and receipts", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.rapport or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    /// Save the PDF into the output directory
    Download,
    /// Send the PDF to the printer
    Print,
    /// Open the PDF in the system viewer
    Preview,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Report title (default depends on the report)
    #[arg(long)]
    title: Option<String>,

    /// What to do with the PDF
    #[arg(long, value_enum, default_value = "download")]
    action: Action,

    /// Custom output file path (default: output_dir/rapport_<kind>_<date>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// Show configuration and session status
    Status,

    /// Generate the expense report
    Expenses {
        /// Read expenses from a JSON file instead of the backend
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Only expenses of this day (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,

        /// Start of the period (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// End of the period (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Expense category id
        #[arg(long)]
        category: Option<String>,

        /// Keep expenses whose description, category or amount contains this text
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Generate the game session report
    Sessions {
        /// JSON file with the sessions to report on
        #[arg(short, long)]
        input: PathBuf,

        /// Period label shown in the header
        #[arg(long)]
        date_range: Option<String>,

        /// Filter label shown in the header
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Store a session token, or sign in as admin with email and password
    Login {
        /// JWT issued by the backend
        #[arg(long, required_unless_present = "email", conflicts_with = "email")]
        token: Option<String>,

        /// Store it as the admin session instead of the cashier one
        #[arg(long)]
        admin: bool,

        /// Admin email, signs in against the backend
        #[arg(long, requires_all = ["admin", "password"])]
        email: Option<String>,

        /// Admin password, used with --email
        #[arg(long, requires = "email")]
        password: Option<String>,
    },

    /// Drop a stored session
    Logout {
        #[arg(long)]
        admin: bool,
    },

    /// Show who is signed in and for how long
    Whoami,

    /// Sign sessions out as their tokens expire
    Watch {
        /// Seconds between checks
        #[arg(long, default_value_t = 60)]
        interval: u64,

        /// Check once and exit
        #[arg(long)]
        once: bool,
    },

    /// Look up and edit single expenses (admin)
    Expense {
        #[command(subcommand)]
        command: ExpenseCommand,
    },

    /// Manage expense categories (admin)
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Record and review stock deliveries (admin)
    Restock {
        #[command(subcommand)]
        command: RestockCommand,
    },

    /// Write a text receipt
    Receipt {
        /// Receipt JSON as returned by the sale endpoint
        #[arg(short, long, conflicts_with = "cart", required_unless_present = "cart")]
        input: Option<PathBuf>,

        /// JSON list of scanned products, one entry per unit
        #[arg(long, requires = "number")]
        cart: Option<PathBuf>,

        /// Receipt number, used with --cart
        #[arg(long)]
        number: Option<String>,

        /// Directory to write into (default: output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ExpenseFields {
    /// Expense category id
    #[arg(long)]
    category: Option<String>,

    /// Amount in FCFA
    #[arg(long)]
    amount: Option<f64>,

    #[arg(long)]
    description: Option<String>,

    /// Expense date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,
}

impl ExpenseFields {
    fn into_draft(self) -> Result<ExpenseDraft> {
        if let Some(date) = &self.date {
            parse_date(date)?;
        }
        Ok(ExpenseDraft {
            expense_category_id: self.category,
            amount: self.amount,
            description: self.description,
            date: self.date,
        })
    }
}

#[derive(Subcommand)]
enum ExpenseCommand {
    /// Show one expense
    Show { id: String },

    /// Record a new expense
    Add {
        /// Expense category id
        #[arg(long)]
        category: String,

        /// Amount in FCFA
        #[arg(long)]
        amount: f64,

        #[arg(long)]
        description: Option<String>,

        /// Expense date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change the given fields of an expense
    Update {
        id: String,

        #[command(flatten)]
        fields: ExpenseFields,
    },

    /// Delete an expense
    Delete { id: String },
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// List expense categories
    List,

    /// Create a category
    Add {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Rename or describe a category
    Update {
        id: String,

        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a category
    Delete { id: String },
}

#[derive(Subcommand)]
enum RestockCommand {
    /// List recorded restocks
    List,

    /// Show the lines of one restock
    Show { id: String },

    /// Record a delivery
    Add {
        /// Delivered line as PRODUCT_ID:QUANTITY[:PURCHASE_PRICE], repeatable
        #[arg(long = "item", required = true, value_parser = parse_restock_item)]
        items: Vec<RestockItem>,
    },
}

fn parse_restock_item(s: &str) -> std::result::Result<RestockItem, String> {
    let mut parts = s.split(':');
    let product_id = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or("missing product id")?;
    let quantity = parts
        .next()
        .ok_or("missing quantity")?
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity: {e}"))?;
    let purchase_price = parts
        .next()
        .map(|p| p.parse::<f64>().map_err(|e| format!("invalid price: {e}")))
        .transpose()?;
    if parts.next().is_some() {
        return Err("expected PRODUCT_ID:QUANTITY[:PURCHASE_PRICE]".into());
    }
    Ok(RestockItem {
        restock_item_id: None,
        product_id: product_id.to_string(),
        quantity,
        purchase_price,
    })
}

fn main() {
    rapport::init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config::config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Expenses {
            input,
            date,
            from,
            to,
            category,
            search,
            export,
        } => {
            let filter = ExpenseFilter {
                date: parse_date_filter(date, from, to)?,
                category,
                search,
            };
            cmd_expenses(&cfg_dir, input, filter, export)
        }
        Commands::Sessions {
            input,
            date_range,
            filter,
            export,
        } => cmd_sessions(&cfg_dir, &input, date_range, filter, export),
        Commands::Login {
            token,
            admin,
            email,
            password,
        } => match (token, email, password) {
            (Some(token), _, _) => cmd_login(&cfg_dir, &token, user_type(admin)),
            (None, Some(email), Some(password)) => cmd_admin_login(&cfg_dir, &email, &password),
            _ => Err(RapportError::NotAuthenticated(user_type(admin).to_string())),
        },
        Commands::Logout { admin } => cmd_logout(&cfg_dir, user_type(admin)),
        Commands::Whoami => cmd_whoami(&cfg_dir),
        Commands::Watch { interval, once } => cmd_watch(&cfg_dir, interval, once),
        Commands::Expense { command } => cmd_expense(&cfg_dir, command),
        Commands::Category { command } => cmd_category(&cfg_dir, command),
        Commands::Restock { command } => cmd_restock(&cfg_dir, command),
        Commands::Receipt {
            input,
            cart,
            number,
            output,
        } => cmd_receipt(&cfg_dir, input, cart, number, output),
    }
}

fn user_type(admin: bool) -> UserType {
    if admin {
        UserType::Admin
    } else {
        UserType::Cashier
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| RapportError::InvalidDate(s.to_string()))
}

fn parse_date_filter(
    date: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<DateFilter> {
    Ok(match (date, from, to) {
        (Some(day), _, _) => DateFilter::Single(parse_date(&day)?),
        (None, Some(from), Some(to)) => DateFilter::Range(parse_date(&from)?, parse_date(&to)?),
        _ => DateFilter::All,
    })
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    config::init(cfg_dir)?;

    println!("Initialized rapport config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your store details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Sign in as admin:         rapport login --admin --email <email> --password <pw>");
    println!();
    println!("Then export your first report:");
    println!("  rapport expenses --from 2024-03-01 --to 2024-03-31");

    Ok(())
}

fn watcher_for(cfg_dir: &Path) -> ExpiryWatcher {
    let store: Arc<dyn TokenStore> = Arc::new(config::session_store(cfg_dir));
    ExpiryWatcher::new(store, Arc::new(SystemClock))
}

fn format_remaining(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m {s:02}s")
    }
}

fn format_expiry(exp: i64) -> String {
    match DateTime::from_timestamp(exp, 0) {
        Some(at) => format_local_date_time(&at.with_timezone(&Local).naive_local()),
        None => exp.to_string(),
    }
}

fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = config::load_config(cfg_dir)?;
    let watcher = watcher_for(cfg_dir);

    println!("Rapport Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Store:            {} (Tel: {})", config.store.name, config.store.phone);
    println!(
        "Output directory: {}",
        config::resolve_output_dir(cfg_dir, &config).display()
    );
    println!("Backend:          {}", config.backend.url);
    println!("Typst:            {}", config.report.typst);

    println!();
    println!("Sessions:");
    for user in UserType::ALL {
        if watcher.is_authenticated(user) {
            println!(
                "  {user:<8} signed in, expires in {}",
                format_remaining(watcher.time_until_expiration(user))
            );
        } else {
            println!("  {user:<8} signed out");
        }
    }

    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpenseInput {
    List(Vec<ExpenseItem>),
    Export {
        expenses: Vec<ExpenseItem>,
        #[serde(default)]
        categories: Vec<ExpenseCategory>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SessionInput {
    List(Vec<GameSessionItem>),
    Export { sessions: Vec<GameSessionItem> },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| RapportError::InputParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Backend client carrying the stored admin token, once it is checked
fn admin_client(config: &Config, cfg_dir: &Path) -> Result<BackendClient> {
    let watcher = watcher_for(cfg_dir);
    watcher.check_now();
    let token = watcher
        .token(UserType::Admin)
        .filter(|_| watcher.is_authenticated(UserType::Admin))
        .ok_or_else(|| RapportError::NotAuthenticated(UserType::Admin.to_string()))?;
    Ok(BackendClient::new(&config.backend.url, token))
}

fn fetch_expenses(
    config: &Config,
    cfg_dir: &Path,
    filter: &ExpenseFilter,
) -> Result<(Vec<ExpenseItem>, Vec<ExpenseCategory>)> {
    let client = admin_client(config, cfg_dir)?;
    let categories = client.expense_categories()?;
    let expenses = client.expenses(filter)?;
    Ok((expenses, categories))
}

fn cmd_expenses(
    cfg_dir: &Path,
    input: Option<PathBuf>,
    filter: ExpenseFilter,
    export: ExportArgs,
) -> Result<()> {
    let config = config::load_config(cfg_dir)?;

    let (expenses, categories) = match &input {
        Some(path) => match read_json::<ExpenseInput>(path)? {
            ExpenseInput::List(expenses) => (expenses, Vec::new()),
            ExpenseInput::Export {
                expenses,
                categories,
            } => (expenses, categories),
        },
        None => fetch_expenses(&config, cfg_dir, &filter)?,
    };

    let expenses = filter.apply(expenses, &categories);

    let header = PartialReportConfig {
        title: export.title.clone(),
        date_range: Some(filter.date.label()),
        filter_type: Some(filter.category_label(&categories)),
        ..config.report_config()
    };
    let generator = ReportGenerator::expenses(header);
    let stats = generator.statistics(&expenses);
    let document = generator.generate(&expenses);

    print_summary(generator.config(), &stats, &document);
    export_report(cfg_dir, &config, generator.kind(), &document, &export)
}

fn cmd_sessions(
    cfg_dir: &Path,
    input: &Path,
    date_range: Option<String>,
    filter: Option<String>,
    export: ExportArgs,
) -> Result<()> {
    let config = config::load_config(cfg_dir)?;

    let sessions = match read_json::<SessionInput>(input)? {
        SessionInput::List(sessions) | SessionInput::Export { sessions } => sessions,
    };

    let header = PartialReportConfig {
        title: export.title.clone(),
        date_range,
        filter_type: filter,
        ..config.report_config()
    };
    let generator = ReportGenerator::sessions(header);
    let stats = generator.statistics(&sessions);
    let document = generator.generate(&sessions);

    print_summary(generator.config(), &stats, &document);
    export_report(cfg_dir, &config, generator.kind(), &document, &export)
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "")]
    label: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "GROUP")]
    key: String,
    #[tabled(rename = "COUNT")]
    count: usize,
    #[tabled(rename = "TOTAL")]
    total: String,
}

fn print_summary(header: &ReportConfig, stats: &Statistics, document: &Document) {
    let rows = vec![
        SummaryRow {
            label: "Records".into(),
            value: stats.count.to_string(),
        },
        SummaryRow {
            label: "Total".into(),
            value: format_currency(stats.total),
        },
        SummaryRow {
            label: "Average".into(),
            value: format_currency(stats.average()),
        },
        SummaryRow {
            label: "Pages".into(),
            value: document.page_count().to_string(),
        },
    ];

    println!("{}", header.title);
    println!("  Période: {}", header.date_range);
    println!("  Filtre:  {}", header.filter_type);
    println!("{}", Table::new(rows).with(Style::rounded()));

    for breakdown in &stats.breakdowns {
        let rows: Vec<GroupRow> = breakdown
            .groups
            .iter()
            .map(|g| GroupRow {
                key: g.key.clone(),
                count: g.count,
                total: format_currency(g.total),
            })
            .collect();
        println!("{}", breakdown.heading);
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

fn export_report(
    cfg_dir: &Path,
    config: &Config,
    kind: ReportKind,
    document: &Document,
    export: &ExportArgs,
) -> Result<()> {
    let renderer = TypstRenderer::new(&config.report.typst);
    let report = RenderedReport::render(kind, document, &renderer)?;

    match export.action {
        Action::Download => {
            let (host, filename) = match &export.output {
                Some(path) => {
                    let dir = path
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .unwrap_or(Path::new("."));
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned());
                    (SystemHost::new(dir), name)
                }
                None => (
                    SystemHost::new(config::resolve_output_dir(cfg_dir, config)),
                    None,
                ),
            };
            let path = report.download(&host, filename.as_deref())?;
            println!("Saved: {}", path.display());
        }
        Action::Print => {
            let host = SystemHost::new(config::resolve_output_dir(cfg_dir, config));
            report.print(&host)?;
            println!("Sent to printer");
        }
        Action::Preview => {
            let host = SystemHost::new(config::resolve_output_dir(cfg_dir, config));
            report.preview(&host)?;
        }
    }

    Ok(())
}

fn cmd_login(cfg_dir: &Path, token: &str, user: UserType) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(RapportError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let payload = auth::decode_payload(token)?;
    if payload.exp <= SystemClock.now_secs() {
        return Err(RapportError::MalformedToken("token has already expired".into()));
    }

    let watcher = watcher_for(cfg_dir);
    let payload = watcher.sign_in(user, token)?;

    let name = payload
        .username
        .or(payload.admin_email)
        .unwrap_or_else(|| user.to_string());
    println!("Signed in as {name} ({user})");
    println!("  Expires: {}", format_expiry(payload.exp));
    Ok(())
}

fn cmd_admin_login(cfg_dir: &Path, email: &str, password: &str) -> Result<()> {
    let config = config::load_config(cfg_dir)?;
    let client = BackendClient::anonymous(&config.backend.url);
    let session = client.admin_login(email, password)?;

    let watcher = watcher_for(cfg_dir);
    let payload = watcher.sign_in(UserType::Admin, &session.token)?;

    println!(
        "Signed in as {} <{}> (admin)",
        session.admin.admin_name, session.admin.admin_email
    );
    println!("  Expires: {}", format_expiry(payload.exp));
    Ok(())
}

fn cmd_logout(cfg_dir: &Path, user: UserType) -> Result<()> {
    let watcher = watcher_for(cfg_dir);
    if watcher.token(user).is_none() {
        println!("No {user} session");
        return Ok(());
    }
    watcher.logout(user)?;
    println!("Signed out {user}");
    Ok(())
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "USER")]
    user: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "EXPIRES")]
    expires: String,
    #[tabled(rename = "REMAINING")]
    remaining: String,
}

fn cmd_whoami(cfg_dir: &Path) -> Result<()> {
    let watcher = watcher_for(cfg_dir);
    for user in watcher.check_now() {
        println!("Session {user} expired, sign in again ({})", user.login_route());
    }

    let rows: Vec<SessionRow> = UserType::ALL
        .into_iter()
        .filter(|u| watcher.is_authenticated(*u))
        .filter_map(|user| {
            let payload = watcher.token_payload(user)?;
            let name = match user {
                UserType::Cashier => watcher.cashier_name(),
                UserType::Admin => payload
                    .admin_email
                    .clone()
                    .or(payload.username.clone())
                    .unwrap_or_default(),
            };
            Some(SessionRow {
                user: user.to_string(),
                name,
                expires: format_expiry(payload.exp),
                remaining: format_remaining(watcher.time_until_expiration(user)),
            })
        })
        .collect();

    if rows.is_empty() {
        println!("Not signed in.");
        return Ok(());
    }

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_watch(cfg_dir: &Path, interval: u64, once: bool) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let store: Arc<dyn TokenStore> = Arc::new(config::session_store(cfg_dir));
    let watcher = ExpiryWatcher::with_handler(store, Arc::new(SystemClock), move |user, reason| {
        let _ = tx.send((user, reason));
    });

    let report = |user: UserType, reason: SignOutReason| {
        if reason == SignOutReason::Expired {
            println!(
                "Session {user} expired, sign in again ({})",
                user.login_route()
            );
        }
    };

    watcher.check_now();
    while let Ok((user, reason)) = rx.try_recv() {
        report(user, reason);
    }

    let signed_in = || UserType::ALL.iter().any(|u| watcher.is_authenticated(*u));
    if once || !signed_in() {
        if !signed_in() {
            println!("Not signed in.");
        }
        return Ok(());
    }

    let interval = Duration::from_secs(interval.max(1));
    watcher.start(interval);
    println!("Watching sessions every {}s", interval.as_secs());

    while signed_in() {
        if let Ok((user, reason)) = rx.recv_timeout(interval) {
            report(user, reason);
        }
    }

    watcher.stop();
    println!("All sessions ended.");
    Ok(())
}

fn cmd_receipt(
    cfg_dir: &Path,
    input: Option<PathBuf>,
    cart: Option<PathBuf>,
    number: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let receipt = match (input, cart) {
        (Some(path), _) => read_json::<Receipt>(&path)?,
        (None, Some(path)) => {
            let mut cart = Cart::new();
            for product in read_json::<Vec<Product>>(&path)? {
                cart.add(&product);
            }
            let cashier = watcher_for(cfg_dir).cashier_name();
            Receipt::from_cart(
                &cart,
                number.unwrap_or_default(),
                Local::now().naive_local(),
                cashier,
            )?
        }
        (None, None) => return Err(RapportError::EmptyCart),
    };

    let dir = match output {
        Some(dir) => dir,
        None => {
            let config = config::load_config(cfg_dir)?;
            config::resolve_output_dir(cfg_dir, &config)
        }
    };
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(receipt.filename());
    std::fs::write(&path, receipt.render_text())?;

    println!("Receipt {}", receipt.receipt_number);
    println!("  Total: {}", format_currency(receipt.total_amount));
    println!("  Saved: {}", path.display());
    Ok(())
}

#[derive(Tabled)]
struct ExpenseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

impl From<&ExpenseItem> for ExpenseRow {
    fn from(e: &ExpenseItem) -> Self {
        Self {
            id: e.expense_id.clone(),
            date: format_date(&e.date),
            category: e.category_name.clone().unwrap_or_default(),
            amount: format_currency(e.amount),
            description: e.description.clone().unwrap_or_default(),
        }
    }
}

fn cmd_expense(cfg_dir: &Path, command: ExpenseCommand) -> Result<()> {
    let config = config::load_config(cfg_dir)?;
    let client = admin_client(&config, cfg_dir)?;

    let shown = match command {
        ExpenseCommand::Show { id } => {
            let mut expense = client.expense(&id)?;
            let categories = client.expense_categories()?;
            rapport::backend::enrich_expenses(std::slice::from_mut(&mut expense), &categories);
            Some(expense)
        }
        ExpenseCommand::Add {
            category,
            amount,
            description,
            date,
        } => {
            let draft = ExpenseFields {
                category: Some(category),
                amount: Some(amount),
                description,
                date: Some(date.unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string())),
            }
            .into_draft()?;
            let created = client.create_expense(&draft)?;
            println!("Expense recorded");
            created
        }
        ExpenseCommand::Update { id, fields } => {
            let updated = client.update_expense(&id, &fields.into_draft()?)?;
            println!("Expense {id} updated");
            updated
        }
        ExpenseCommand::Delete { id } => {
            client.delete_expense(&id)?;
            println!("Expense {id} deleted");
            None
        }
    };

    if let Some(expense) = shown {
        let table = Table::new([ExpenseRow::from(&expense)])
            .with(Style::rounded())
            .to_string();
        println!("{table}");
    }
    Ok(())
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

fn cmd_category(cfg_dir: &Path, command: CategoryCommand) -> Result<()> {
    let config = config::load_config(cfg_dir)?;
    let client = admin_client(&config, cfg_dir)?;

    match command {
        CategoryCommand::List => {
            let categories = client.expense_categories()?;
            if categories.is_empty() {
                println!("No categories.");
                return Ok(());
            }
            let rows: Vec<CategoryRow> = categories
                .into_iter()
                .map(|c| CategoryRow {
                    id: c.expense_category_id,
                    name: c.name,
                    description: c.description.unwrap_or_default(),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
        CategoryCommand::Add { name, description } => {
            let created = client.create_category(&CategoryDraft {
                name: name.clone(),
                description,
            })?;
            match created {
                Some(c) => println!("Category {} created ({})", c.name, c.expense_category_id),
                None => println!("Category {name} created"),
            }
        }
        CategoryCommand::Update {
            id,
            name,
            description,
        } => {
            client.update_category(&id, &CategoryDraft { name, description })?;
            println!("Category {id} updated");
        }
        CategoryCommand::Delete { id } => {
            client.delete_category(&id)?;
            println!("Category {id} deleted");
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct RestockRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "LINES")]
    lines: usize,
    #[tabled(rename = "UNITS")]
    units: u32,
    #[tabled(rename = "COST")]
    cost: String,
}

impl From<&Restock> for RestockRow {
    fn from(r: &Restock) -> Self {
        Self {
            id: r.restock_id.clone(),
            date: format_date(&r.date),
            lines: r.items.len(),
            units: r.total_quantity(),
            cost: format_currency(r.total_cost()),
        }
    }
}

#[derive(Tabled)]
struct RestockLineRow {
    #[tabled(rename = "PRODUCT")]
    product: String,
    #[tabled(rename = "QTY")]
    quantity: u32,
    #[tabled(rename = "UNIT PRICE")]
    price: String,
}

fn print_restock(restock: &Restock) {
    println!("{}", Table::new([RestockRow::from(restock)]).with(Style::rounded()));
    let lines: Vec<RestockLineRow> = restock
        .items
        .iter()
        .map(|i| RestockLineRow {
            product: i.product_id.clone(),
            quantity: i.quantity,
            price: i.purchase_price.map(format_currency).unwrap_or_default(),
        })
        .collect();
    if !lines.is_empty() {
        println!("{}", Table::new(lines).with(Style::rounded()));
    }
}

fn cmd_restock(cfg_dir: &Path, command: RestockCommand) -> Result<()> {
    let config = config::load_config(cfg_dir)?;
    let client = admin_client(&config, cfg_dir)?;

    match command {
        RestockCommand::List => {
            let restocks = client.restocks()?;
            if restocks.is_empty() {
                println!("No restocks.");
                return Ok(());
            }
            let rows: Vec<RestockRow> = restocks.iter().map(RestockRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        RestockCommand::Show { id } => print_restock(&client.restock(&id)?),
        RestockCommand::Add { items } => {
            let restock = client.create_restock(&items)?;
            println!("Restock recorded");
            print_restock(&restock);
        }
    }
    Ok(())
}
