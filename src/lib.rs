pub mod api;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod excerpt;
pub mod front_end;
pub mod fs;
pub mod model;
pub mod output;
pub mod style;

pub use api::{ApigraphError, extract, extract_program, extract_source};
pub use cli::Cli;
pub use collector::Collector;
pub use commands::{cmd_extract, cmd_init};
pub use config::Config;
pub use excerpt::{Excerpt, ExcerptBuilder};
pub use front_end::{FrontEnd, Program, TypeScriptLoader};
pub use model::{ApiItem, ApiPackage, Diagnostic, ExtractionResult};
