pub mod config;
pub mod error;
pub mod import;
pub mod writer;

pub use config::LoaderConfig;
pub use error::LoaderError;
pub use import::{run_import, ImportSummary};
pub use writer::SqliteWriter;
