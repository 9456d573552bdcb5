mod typst;

pub use typst::TypstRenderer;

use crate::error::Result;
use crate::report::Document;

/// Turns a laid-out document into PDF bytes
pub trait Renderer {
    fn render(&self, document: &Document) -> Result<Vec<u8>>;
}
