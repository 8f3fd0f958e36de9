mod text;

pub use text::{
    ADMIN_ONLY, ANALYTICS_FAILED, GENERATING, UNSUBSCRIBED, start_text, subscribed_text,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Subscribe,
    Unsubscribe,
    Analytics,
}

impl Command {
    /// Recognise a `/command` message.
    ///
    /// The name is the first word without the slash and without any
    /// `@botname` suffix; arguments are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('/')?;
        let word = rest.split(char::is_whitespace).next()?;
        let name = word.split('@').next().unwrap_or_default();

        match name {
            "start" => Some(Command::Start),
            "subscribe" => Some(Command::Subscribe),
            "unsubscribe" => Some(Command::Unsubscribe),
            "analytics" => Some(Command::Analytics),
            _ => None,
        }
    }

    pub fn admin_only(&self) -> bool {
        !matches!(self, Command::Start)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Subscribe => "subscribe",
            Command::Unsubscribe => "unsubscribe",
            Command::Analytics => "analytics",
        }
    }
}
