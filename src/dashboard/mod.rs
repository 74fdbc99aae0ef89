// src/dashboard/mod.rs
pub mod controller;
pub mod server;
pub mod state;

pub use controller::{Binding, DashboardController};
pub use server::{route, serve};
pub use state::{DashboardEvent, DashboardState, PageLayout, OutputKey, OutputValue, StateUpdate};
