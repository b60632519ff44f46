pub mod loader;
pub mod schema;

pub use loader::{load_for_repo, load_from_path, load_from_str, ConfigError};
pub use schema::{Links, UpdaterConfig, ValidationError, ValidationIssue, DEFAULT_CONFIG_FILE};
