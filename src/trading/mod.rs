// src/trading/mod.rs
pub mod orders;
pub mod settlement;

pub use orders::{parse_quantity, OrderTicket};
pub use settlement::{BalanceSettlementPoller, BalanceSource};
