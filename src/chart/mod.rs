// src/chart/mod.rs
pub mod figure;

pub use figure::{render_figure, ChartFigure, Trace};
