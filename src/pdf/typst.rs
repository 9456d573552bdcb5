use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use super::Renderer;
use crate::error::{RapportError, Result};
use crate::report::Document;

/// Embedded Typst template that replays a laid-out document.
/// Uses a placeholder that gets replaced with the actual JSON file path
const REPORT_TEMPLATE: &str = r##"// Report Template
// Page content is loaded from JSON file, all positions in millimetres

#let data = json("DATA_JSON_PATH")

#set page(paper: "a4", margin: 0pt)
#set text(font: ("Helvetica", "Arial", "Liberation Sans"))

// Text positions are baselines; place() anchors the top of the box
#let cap-height = 0.718

#for (i, page) in data.pages.enumerate() {
  if i > 0 { pagebreak() }
  for op in page.ops {
    if op.kind == "text" {
      place(
        top + left,
        dx: op.x * 1mm,
        dy: op.y * 1mm - op.size * cap-height * 1pt,
        text(
          size: op.size * 1pt,
          weight: if op.bold { "bold" } else { "regular" },
          op.text,
        ),
      )
    } else if op.kind == "rule" {
      place(
        top + left,
        dx: op.x1 * 1mm,
        dy: op.y * 1mm,
        line(length: (op.x2 - op.x1) * 1mm, stroke: op.thickness * 1mm),
      )
    }
  }
}
"##;

/// Compiles documents with the `typst` CLI
#[derive(Debug, Clone)]
pub struct TypstRenderer {
    binary: PathBuf,
    /// Parent of the per-render scratch directory, system temp dir if unset
    scratch_root: Option<PathBuf>,
}

impl Default for TypstRenderer {
    fn default() -> Self {
        Self::new("typst")
    }
}

impl TypstRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scratch_root: None,
        }
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("rapport-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Template source with the data file name filled in
    pub fn template(data_file: &str) -> String {
        REPORT_TEMPLATE.replace("DATA_JSON_PATH", data_file)
    }
}

impl Renderer for TypstRenderer {
    fn render(&self, document: &Document) -> Result<Vec<u8>> {
        // Check if typst is available
        if Command::new(&self.binary).arg("--version").output().is_err() {
            return Err(RapportError::TypstNotFound);
        }

        // Removed when dropped, whichever way this returns
        let scratch = self.scratch_dir()?;
        let temp_dir = scratch.path();

        let json_data = serde_json::to_string(document)
            .map_err(|e| RapportError::PdfGeneration(e.to_string()))?;
        let json_path = temp_dir.join("report.json");
        std::fs::write(&json_path, &json_data)?;

        let template_path = temp_dir.join("report.typ");
        std::fs::write(&template_path, Self::template("report.json"))?;

        let pdf_path = temp_dir.join("report.pdf");

        debug!(pages = document.page_count(), dir = %temp_dir.display(), "compiling report");

        // Run typst compile with root set to temp directory
        let output = Command::new(&self.binary)
            .arg("compile")
            .arg("--root")
            .arg(temp_dir)
            .arg(&template_path)
            .arg(&pdf_path)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RapportError::PdfGeneration(stderr.to_string()));
        }

        let bytes = std::fs::read(&pdf_path)?;
        Ok(bytes)
    }
}
