pub mod core;
pub mod input;
pub mod models;

pub use self::core::{ChatSession, Command, Turn, EXIT_COMMAND, FAREWELL, PROMPT};
pub use input::{BufReadSource, LineSource};
pub use models::{FailurePolicy, Transcript};
