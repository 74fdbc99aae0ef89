// src/analysis/mod.rs
pub mod indicators;

pub use indicators::{macd, moving_average, relative_strength_index, Macd, Series};
