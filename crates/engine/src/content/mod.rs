mod compiler;
mod database;
mod discovery;
mod types;

pub use compiler::{compile_def_database, ContentCompileError, ContentErrorCode, SourceLocation};
pub use database::{CharacterDef, CharacterDefId, DefDatabase, EventDef};
pub use types::{ContentDiscoveryError, ContentRequest};
