use crate::scheduler::ScheduleSpec;

pub const ADMIN_ONLY: &str = "Sorry, this command is only available to the bot administrator! 🔒";
pub const UNSUBSCRIBED: &str =
    "You have unsubscribed from the daily analytics 😢 We'll miss you! 💔";
pub const GENERATING: &str = "Generating analytics, please wait... ⏳";
pub const ANALYTICS_FAILED: &str =
    "Sorry, something went wrong while generating the analytics 😢 Please try again later! 💕";

pub fn start_text(schedule: &ScheduleSpec, is_admin: bool) -> String {
    let mut text = format!(
        "Hi! 👋 I'm your friendly investment helper! 💖

Every day at {schedule} I'll send you analytics on the Russian market with ideas on where to put 1000 rubles! 💰

Commands:
/subscribe - subscribe to the daily analytics 📊
/unsubscribe - unsubscribe from the daily analytics 🚫
/analytics - get the analytics right now ✨"
    );

    if is_admin {
        text.push_str("\n\n🔐 You are the bot administrator and have access to every function!");
    }

    text
}

pub fn subscribed_text(schedule: &ScheduleSpec) -> String {
    format!(
        "You have subscribed to the daily analytics! 🎉 Expect the first issue at {schedule}! 💖"
    )
}
