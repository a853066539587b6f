pub mod config;
pub mod der;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::ToolkitConfig;
pub use error::{BaccError, Result};
pub use types::{Element, LogOffset, SecurityLevel};
