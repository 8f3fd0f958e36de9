use chrono::NaiveDate;

/// Substituted for the market block when no snapshot could be read.
pub const MARKET_DATA_UNAVAILABLE: &str = "Market data is currently unavailable.";

pub fn system_prompt() -> String {
    [
        "You are a friendly, upbeat personal investment assistant writing a daily update on the Russian stock market.",
        "Audience: beginners who want to know where to put 1000 rubles today.",
        "Structure the message as:",
        "1. A short greeting with today's date.",
        "2. The overall situation on the Russian market (indices, ruble rate, trend).",
        "3. Where to invest 1000 rubles today, naming one concrete stock or instrument and the broker to use.",
        "4. Why this is a good idea right now.",
        "5. One practical tip for earning a little extra money.",
        "6. A warm sign-off.",
        "Rules:",
        "- Base every number on the market data provided by the user; never invent quotes.",
        "- Keep it under 2000 characters.",
        "- Use emojis generously and simple Markdown (bold headings only).",
        "- Do not add disclaimers longer than one sentence.",
    ]
    .join("\n")
}

pub fn user_prompt(today: NaiveDate, market_context: &str) -> String {
    format!(
        "Today's date: {}. Please write the analytics for today specifically.\n\nCurrent market data:\n{}",
        today.format("%d.%m.%Y"),
        market_context
    )
}

/// Canned analytics used when no completion credential is configured.
pub fn local_analytics(today: NaiveDate) -> String {
    format!(
        "✨ **Daily market analytics** ✨
🗓 **{}**

Hi there, dear investor! 👋💕

The Russian market looks really interesting today! 📊 I went through all the trends just for you! 🌟

🔍 **Overall situation on the Russian market**:
The MOEX index is showing modest growth today, which opens up nice opportunities! 💫 The ruble is stable, which makes planning easier! 🧮

💰 **Where to put 1000 rubles**:
For this amount I suggest looking at Gazprom shares through Sber Investments! 🏦 They trade at an attractive price and have good growth potential over the coming months! 📈

An alternative is a savings account at T-Bank with 16% a year for new customers! 💝 A safe way to protect your money right now! 🔐

🌈 **Why this makes sense**:
Gazprom pays steady dividends and the energy market conditions favour the company! ✅ Even with 1000 rubles you get real investing experience! 🤓

🎁 **Side-income tip**:
Did you know you can earn from what you know? 🧠 Q&A platforms pay for quality answers, and some experts make up to 20000 rubles a month in two hours a day! 🕰️ 💸

Hope this was useful! 🌺 See you tomorrow with fresh insights! 💖

Your financial assistant! 💝",
        today.format("%d.%m.%Y")
    )
}
