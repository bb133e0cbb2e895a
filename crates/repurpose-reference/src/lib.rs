pub mod error;
pub mod memory;
pub mod reader;
pub mod sqlite;

pub use error::ReferenceError;
pub use reader::ReferenceReader;
pub use sqlite::SqliteReference;
