// src/chart/figure.rs
// Plotly-compatible figure built from a candle frame. The page hands this
// payload straight to the plotting library.
use crate::analysis::indicators::Series;
use crate::market_data::frame::{CandleFrame, Direction, FrameRow};
use serde::Serialize;
use serde_json::{json, Value};

const FIGURE_HEIGHT: u32 = 900;
const VERTICAL_SPACING: f64 = 0.01;
/// Relative heights of the price, MACD and RSI panels
const ROW_HEIGHTS: [f64; 3] = [0.8, 0.2, 0.15];
/// Volume bars use at most a fifth of the price panel
const VOLUME_HEADROOM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: &'static str,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: Vec<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Candlestick {
        name: &'static str,
        x: Vec<String>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        xaxis: &'static str,
        yaxis: &'static str,
    },
    Scatter {
        name: &'static str,
        x: Vec<String>,
        y: Series,
        mode: &'static str,
        line: Line,
        #[serde(skip_serializing_if = "Option::is_none")]
        opacity: Option<f64>,
        xaxis: &'static str,
        yaxis: &'static str,
    },
    Bar {
        name: &'static str,
        x: Vec<String>,
        y: Series,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<Marker>,
        xaxis: &'static str,
        yaxis: &'static str,
    },
}

impl Trace {
    pub fn name(&self) -> &'static str {
        match self {
            Trace::Candlestick { name, .. } | Trace::Scatter { name, .. } | Trace::Bar { name, .. } => *name,
        }
    }

    pub fn x(&self) -> &[String] {
        match self {
            Trace::Candlestick { x, .. } | Trace::Scatter { x, .. } | Trace::Bar { x, .. } => x,
        }
    }

    pub fn with_opacity(mut self, value: f64) -> Self {
        if let Trace::Scatter { opacity, .. } = &mut self {
            *opacity = Some(value);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFigure {
    pub data: Vec<Trace>,
    pub layout: Value,
}

impl ChartFigure {
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.data.iter().find(|t| t.name() == name)
    }

    /// Number of points along the shared time axis
    pub fn point_count(&self) -> usize {
        self.data.first().map(|t| t.x().len()).unwrap_or(0)
    }
}

/// Vertical [start, end] domains of the three panels, top panel first
fn panel_domains() -> [[f64; 2]; 3] {
    let total: f64 = ROW_HEIGHTS.iter().sum();
    let usable = 1.0 - VERTICAL_SPACING * (ROW_HEIGHTS.len() - 1) as f64;

    let mut domains = [[0.0; 2]; 3];
    let mut top = 1.0;
    for (i, height) in ROW_HEIGHTS.iter().enumerate() {
        let bottom = (top - usable * height / total).max(0.0);
        domains[i] = [bottom, top];
        top = bottom - VERTICAL_SPACING;
    }
    domains
}

fn scatter(name: &'static str, x: &[String], y: Series, color: &'static str, width: u32, yaxis: &'static str) -> Trace {
    Trace::Scatter {
        name,
        x: x.to_vec(),
        y,
        mode: "lines",
        line: Line { color, width },
        opacity: None,
        xaxis: "x",
        yaxis,
    }
}

/// Price panel with candles, moving averages and volume; MACD panel; RSI panel
pub fn render_figure(frame: &CandleFrame) -> ChartFigure {
    let x: Vec<String> = frame
        .rows
        .iter()
        .map(|r| r.candle.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    let values = |f: fn(&FrameRow) -> f64| -> Vec<f64> {
        frame.rows.iter().map(f).collect()
    };

    let ma20 = scatter("MA 20", &x, frame.column(|r| r.ma20), "blue", 2, "y").with_opacity(0.7);
    let ma7 = scatter("MA 7", &x, frame.column(|r| r.ma7), "orange", 2, "y").with_opacity(0.7);

    let data = vec![
        Trace::Candlestick {
            name: "Price",
            x: x.clone(),
            open: values(|r| r.candle.open),
            high: values(|r| r.candle.high),
            low: values(|r| r.candle.low),
            close: values(|r| r.candle.close),
            xaxis: "x",
            yaxis: "y",
        },
        ma20,
        ma7,
        Trace::Bar {
            name: "Volume",
            x: x.clone(),
            y: frame.column(|r| Some(r.candle.volume)),
            marker: Some(Marker {
                color: frame.rows.iter().map(|r| r.direction).collect(),
            }),
            xaxis: "x",
            yaxis: "y2",
        },
        Trace::Bar {
            name: "MACD histogram",
            x: x.clone(),
            y: frame.column(|r| r.macd_histogram),
            marker: None,
            xaxis: "x",
            yaxis: "y3",
        },
        scatter("MACD", &x, frame.column(|r| r.macd), "black", 2, "y3"),
        scatter("Signal", &x, frame.column(|r| r.macd_signal), "red", 1, "y3"),
        scatter("RSI", &x, frame.column(|r| r.rsi), "purple", 1, "y4"),
    ];

    let [price, macd, rsi] = panel_domains();
    let layout = json!({
        "height": FIGURE_HEIGHT,
        "showlegend": false,
        "xaxis": { "anchor": "y4", "rangeslider": { "visible": false } },
        "yaxis": { "domain": price, "title": { "text": "<b>Price</b>" } },
        "yaxis2": {
            "overlaying": "y",
            "side": "right",
            "range": [0.0, frame.max_volume() * VOLUME_HEADROOM],
            "title": { "text": "<b>Volume</b>" }
        },
        "yaxis3": { "domain": macd, "showgrid": false, "title": { "text": "<b>MACD</b>" } },
        "yaxis4": { "domain": rsi, "title": { "text": "<b>RSI</b>" } }
    });

    ChartFigure { data, layout }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn frame(n: i64) -> CandleFrame {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let candles = (0..n)
            .map(|i| Candle {
                timestamp: start + Duration::hours(i),
                open: 100.0,
                high: 110.0,
                low: 90.0,
                close: if i % 2 == 0 { 105.0 } else { 95.0 },
                volume: (i + 1) as f64,
            })
            .collect();
        CandleFrame::from_candles(candles).unwrap()
    }

    #[test]
    fn every_trace_spans_every_point() {
        let figure = render_figure(&frame(30));
        assert_eq!(figure.data.len(), 8);
        assert_eq!(figure.point_count(), 30);
        assert!(figure.data.iter().all(|t| t.x().len() == 30));
    }

    #[test]
    fn volume_axis_leaves_headroom() {
        let figure = render_figure(&frame(10));
        assert_eq!(figure.layout["yaxis2"]["range"][1], json!(50.0));
        assert_eq!(figure.layout["height"], json!(900));
    }

    #[test]
    fn undefined_points_serialize_as_null() {
        let figure = render_figure(&frame(10));
        let payload = serde_json::to_value(&figure).unwrap();
        let ma20 = payload["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "MA 20")
            .unwrap();
        assert_eq!(ma20["type"], "scatter");
        assert!(ma20["y"].as_array().unwrap().iter().all(Value::is_null));
        assert_eq!(ma20["opacity"], json!(0.7));

        let volume = payload["data"][3].clone();
        assert_eq!(volume["marker"]["color"][0], "green");
        assert_eq!(volume["marker"]["color"][1], "red");
    }

    #[test]
    fn panels_stack_without_overlap() {
        let [price, macd, rsi] = panel_domains();
        assert!((price[1] - 1.0).abs() < 1e-12);
        assert!(price[0] > macd[1]);
        assert!(macd[0] > rsi[1]);
        assert!(rsi[0].abs() < 1e-9);
        assert!(price[1] - price[0] > (macd[1] - macd[0]) * 3.9);
    }
}
