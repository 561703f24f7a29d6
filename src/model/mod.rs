pub mod config;
pub mod item;
pub mod settings;
pub mod workspace;

pub use config::*;
pub use item::*;
pub use settings::*;
pub use workspace::*;
