use std::fs;
use std::path::{Path, PathBuf};

use crate::io::kv::FileKv;
use crate::model::config::StackConfig;
use crate::model::workspace::Workspace;
use crate::store::{StackStore, StoreError};

/// Name of the per-workspace directory.
pub const STORE_DIR: &str = ".tstack";

const CONFIG_FILE: &str = "config.toml";

const CONFIG_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Error type for workspace discovery and config I/O
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("not a tstack workspace: no .tstack/ directory found (run `tstack init`)")]
    NotAWorkspace,
    #[error("already initialized: {0}")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Walk up from `start` looking for a `.tstack/config.toml`.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        let store_dir = current.join(STORE_DIR);
        if store_dir.is_dir() && store_dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(WorkspaceError::NotAWorkspace);
        }
    }
}

/// Load the workspace rooted at `root`.
pub fn load_workspace(root: &Path) -> Result<Workspace, WorkspaceError> {
    let store_dir = root.join(STORE_DIR);
    if !store_dir.is_dir() {
        return Err(WorkspaceError::NotAWorkspace);
    }
    let config = read_config(&store_dir)?;
    Ok(Workspace {
        root: root.to_path_buf(),
        store_dir,
        config,
    })
}

pub fn read_config(store_dir: &Path) -> Result<StackConfig, WorkspaceError> {
    let config_path = store_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&config_path).map_err(|e| WorkspaceError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Create `.tstack/` with a commented config under `root`.
/// With `force`, an existing config is rewritten; stack records are kept.
pub fn init_workspace(root: &Path, force: bool) -> Result<PathBuf, WorkspaceError> {
    let store_dir = root.join(STORE_DIR);
    let config_path = store_dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        return Err(WorkspaceError::AlreadyInitialized(store_dir));
    }
    fs::create_dir_all(&store_dir)?;
    fs::write(&config_path, CONFIG_TEMPLATE)?;
    tracing::debug!(path = %store_dir.display(), "initialized workspace");
    Ok(store_dir)
}

impl Workspace {
    pub fn kv(&self) -> FileKv {
        FileKv::new(&self.store_dir)
    }

    /// Open the stack with this workspace's default settings.
    pub fn open_store(&self) -> Result<StackStore<FileKv>, StoreError> {
        StackStore::open(self.kv(), self.config.defaults.settings())
    }
}
