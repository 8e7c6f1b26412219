pub mod commands;
pub mod data;
pub mod handlers;
pub mod logging;
pub mod reconciler;

// Customize these constants for your bot
pub const BOT_NAME: &str = "globalban";
pub const COMMAND_TARGET: &str = "globalban::command";
pub const ERROR_TARGET: &str = "globalban::error";
pub const EVENT_TARGET: &str = "globalban::handlers";
pub const AUDIT_TARGET: &str = "globalban::audit";
pub const CONSOLE_TARGET: &str = "globalban";

pub use data::{Data, DataInner};
pub use reconciler::{Reconciler, RosterStore};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
