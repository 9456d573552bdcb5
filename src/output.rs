use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::error::{RapportError, Result};
use crate::pdf::Renderer;
use crate::report::{Document, ReportKind};

/// File and viewer access of the environment the report is exported into
pub trait Host {
    /// Persist `bytes` under `filename`, returning where they landed
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
    /// Show the document without printing it
    fn open(&self, filename: &str, bytes: &[u8]) -> Result<()>;
    /// Show the document and send it to the printer
    fn print(&self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// A generated report, rendered once and exported any number of times
#[derive(Debug, Clone)]
pub struct RenderedReport {
    kind: ReportKind,
    bytes: Vec<u8>,
}

impl RenderedReport {
    pub fn render(kind: ReportKind, document: &Document, renderer: &dyn Renderer) -> Result<Self> {
        let bytes = renderer.render(document)?;
        Ok(Self { kind, bytes })
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `rapport_<kind>_<YYYY-MM-DD>.pdf`
    pub fn default_filename(&self, date: NaiveDate) -> String {
        format!(
            "rapport_{}_{}.pdf",
            self.kind.file_stem(),
            date.format("%Y-%m-%d")
        )
    }

    fn todays_filename(&self) -> String {
        self.default_filename(Utc::now().date_naive())
    }

    pub fn download(&self, host: &dyn Host, filename: Option<&str>) -> Result<PathBuf> {
        let name = match filename {
            Some(name) => name.to_string(),
            None => self.todays_filename(),
        };
        let path = host.save(&name, &self.bytes)?;
        info!(path = %path.display(), "report saved");
        Ok(path)
    }

    pub fn print(&self, host: &dyn Host) -> Result<()> {
        host.print(&self.todays_filename(), &self.bytes)
    }

    pub fn preview(&self, host: &dyn Host) -> Result<()> {
        host.open(&self.todays_filename(), &self.bytes)
    }
}

/// Saves into a directory and hands files to the desktop viewer
#[derive(Debug, Clone)]
pub struct SystemHost {
    output_dir: PathBuf,
}

impl SystemHost {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn write_to(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(filename);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Previews and print jobs go through a scratch copy
    fn scratch_copy(filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        Self::write_to(&std::env::temp_dir().join("rapport-view"), filename, bytes)
    }
}

impl Host for SystemHost {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        Self::write_to(&self.output_dir, filename, bytes)
    }

    fn open(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = Self::scratch_copy(filename, bytes)?;
        open_path(&path)
    }

    fn print(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = Self::scratch_copy(filename, bytes)?;
        print_path(&path)
    }
}

/// Open with system default viewer
pub fn open_path(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()
            .map_err(RapportError::Io)?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()
            .map_err(RapportError::Io)?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()
            .map_err(RapportError::Io)?;
    }
    Ok(())
}

fn print_path(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::process::Command::new("lp")
            .arg(path)
            .spawn()
            .map_err(RapportError::Io)?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("powershell")
            .args(["-NoProfile", "-Command", "Start-Process", "-Verb", "Print", "-FilePath"])
            .arg(path)
            .spawn()
            .map_err(RapportError::Io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FixedRenderer;

    impl Renderer for FixedRenderer {
        fn render(&self, document: &Document) -> Result<Vec<u8>> {
            Ok(format!("%PDF pages={}", document.page_count()).into_bytes())
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        saved: RefCell<Vec<(String, Vec<u8>)>>,
        opened: RefCell<Vec<String>>,
        printed: RefCell<Vec<String>>,
    }

    impl Host for RecordingHost {
        fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
            self.saved
                .borrow_mut()
                .push((filename.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(filename))
        }

        fn open(&self, filename: &str, _bytes: &[u8]) -> Result<()> {
            self.opened.borrow_mut().push(filename.to_string());
            Ok(())
        }

        fn print(&self, filename: &str, _bytes: &[u8]) -> Result<()> {
            self.printed.borrow_mut().push(filename.to_string());
            Ok(())
        }
    }

    fn rendered(kind: ReportKind) -> RenderedReport {
        let document = crate::report::Canvas::new().finish();
        RenderedReport::render(kind, &document, &FixedRenderer).unwrap()
    }

    #[test]
    fn default_filename_uses_kind_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            rendered(ReportKind::Expenses).default_filename(date),
            "rapport_depenses_2024-03-01.pdf"
        );
        assert_eq!(
            rendered(ReportKind::Sessions).default_filename(date),
            "rapport_sessions_jeu_2024-03-01.pdf"
        );
    }

    #[test]
    fn repeated_downloads_save_identical_bytes() {
        let report = rendered(ReportKind::Expenses);
        let host = RecordingHost::default();

        report.download(&host, None).unwrap();
        report.download(&host, None).unwrap();

        let saved = host.saved.borrow();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].1, saved[1].1);
        assert!(saved[0].0.starts_with("rapport_depenses_"));
        assert!(saved[0].0.ends_with(".pdf"));
    }

    #[test]
    fn caller_filename_wins() {
        let report = rendered(ReportKind::Sessions);
        let host = RecordingHost::default();
        let path = report.download(&host, Some("mars.pdf")).unwrap();
        assert_eq!(path, PathBuf::from("mars.pdf"));
    }

    #[test]
    fn print_and_preview_do_not_save() {
        let report = rendered(ReportKind::Sessions);
        let host = RecordingHost::default();
        report.print(&host).unwrap();
        report.preview(&host).unwrap();
        assert!(host.saved.borrow().is_empty());
        assert_eq!(host.printed.borrow().len(), 1);
        assert_eq!(host.opened.borrow().len(), 1);
    }

    #[test]
    fn system_host_writes_into_output_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let host = SystemHost::new(dir.path().join("out"));
        let path = rendered(ReportKind::Expenses)
            .download(&host, Some("r.pdf"))
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF pages=1");
    }
}
