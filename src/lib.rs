pub mod config;
pub mod dirs;
pub mod logs;
pub mod server;
pub mod table;
pub mod time;
pub mod types;
