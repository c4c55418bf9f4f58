pub mod app;
pub mod commands;
pub mod session;
pub mod ui;

pub use app::{Cli, Commands};
pub use session::Session;
