use std::path::PathBuf;

use super::config::StackConfig;

/// A discovered tstack workspace
#[derive(Debug)]
pub struct Workspace {
    /// Directory containing `.tstack/`
    pub root: PathBuf,
    /// Path to the `.tstack/` directory holding config, records and logs
    pub store_dir: PathBuf,
    /// Parsed config.toml
    pub config: StackConfig,
}
