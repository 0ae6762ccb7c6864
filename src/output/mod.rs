mod json;
mod markdown;

pub use json::JsonOutput;
pub use markdown::MarkdownOutput;

use crate::model::ExtractionResult;
use std::io::Write;

pub trait OutputFormatter {
    fn format<W: Write>(&self, result: &ExtractionResult, writer: &mut W) -> std::io::Result<()>;
}
