//! 命令定义和实现

pub mod config;
pub mod drive;
pub mod inspect;

pub use config::ConfigCommand;
pub use drive::DriveCommand;
pub use inspect::InspectCommand;
