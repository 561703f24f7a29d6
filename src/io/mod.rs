pub mod kv;
pub mod lock;
pub mod recovery;
pub mod sweeper;
pub mod watcher;
pub mod workspace_io;
