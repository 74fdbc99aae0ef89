// src/market_data/mod.rs
pub mod frame;
pub mod greeting;

pub use frame::{CandleFrame, Direction, FrameRow};
pub use greeting::{greeting_for, price_line};
