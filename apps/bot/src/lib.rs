use tokio::sync::mpsc;

pub mod chat;
pub mod command;
pub mod config;
pub mod daily;
pub mod discord;
pub mod dispatcher;
pub mod registry;
pub mod scheduler;

use chat::ChatUpdate;

pub struct Data {
    pub updates: mpsc::UnboundedSender<ChatUpdate>,
}

pub type Error = anyhow::Error;
