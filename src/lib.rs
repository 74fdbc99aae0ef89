// src/lib.rs
// Main library module declarations

pub mod analysis;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod exchange;
pub mod market_data;
pub mod trading;
