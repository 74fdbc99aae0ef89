// src/market_data/greeting.rs
use crate::domain::models::Ticker;
use chrono::{NaiveTime, Timelike};

/// Time-of-day band: [06:00, 12:00) morning, [12:00, 18:00) afternoon,
/// everything else evening.
pub fn greeting_for(time: NaiveTime) -> &'static str {
    match time.hour() {
        6..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

/// The dashboard's price line, e.g.
/// "Good morning. The price of BTC-USD is 43000.12 USD."
pub fn price_line(time: NaiveTime, ticker: &Ticker) -> String {
    format!(
        "{}. The price of {} is {} {}.",
        greeting_for(time),
        ticker.product_id,
        ticker.price,
        ticker.product_id.quote()
    )
}
