// src/market_data/frame.rs
use crate::analysis::indicators::{self, Series};
use crate::domain::errors::AnalysisResult;
use crate::domain::models::Candle;
use serde::Serialize;

pub const FAST_MA: usize = 7;
pub const SLOW_MA: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Whether a candle closed at or above its open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Green,
    Red,
}

/// A candle together with everything derived from it for display
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub candle: Candle,
    /// close - open
    pub delta: f64,
    pub direction: Direction,
    pub ma7: Option<f64>,
    pub ma20: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
}

/// Chronologically ordered candles with their derived indicator columns
#[derive(Debug, Clone, PartialEq)]
pub struct CandleFrame {
    pub rows: Vec<FrameRow>,
}

impl CandleFrame {
    /// Build the frame; candles are put in timestamp order first since every
    /// indicator is order-sensitive.
    pub fn from_candles(mut candles: Vec<Candle>) -> AnalysisResult<Self> {
        candles.sort_by_key(|c| c.timestamp);

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let ma7 = indicators::moving_average(&closes, FAST_MA)?;
        let ma20 = indicators::moving_average(&closes, SLOW_MA)?;
        let rsi = indicators::relative_strength_index(&closes, RSI_PERIOD)?;
        let macd = indicators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?;

        let rows = candles
            .into_iter()
            .enumerate()
            .map(|(i, candle)| {
                let delta = candle.close - candle.open;
                FrameRow {
                    direction: if delta >= 0.0 { Direction::Green } else { Direction::Red },
                    delta,
                    ma7: ma7[i],
                    ma20: ma20[i],
                    rsi: rsi[i],
                    macd: macd.line[i],
                    macd_signal: macd.signal[i],
                    macd_histogram: macd.histogram[i],
                    candle,
                }
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn max_volume(&self) -> f64 {
        self.rows.iter().map(|r| r.candle.volume).fold(0.0, f64::max)
    }

    pub fn column<F>(&self, f: F) -> Series
    where
        F: Fn(&FrameRow) -> Option<f64>,
    {
        self.rows.iter().map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candle(hour: i64, open: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::hours(hour),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 10.0 + hour as f64,
        }
    }

    #[test]
    fn rows_are_chronological_whatever_the_input_order() {
        let mut candles: Vec<Candle> = (0..25).map(|h| candle(h, 100.0, 100.0 + h as f64)).collect();
        candles.reverse();
        candles.swap(3, 17);

        let frame = CandleFrame::from_candles(candles).unwrap();
        assert_eq!(frame.len(), 25);
        assert!(frame
            .rows
            .windows(2)
            .all(|w| w[0].candle.timestamp <= w[1].candle.timestamp));
    }

    #[test]
    fn direction_follows_close_minus_open() {
        let frame = CandleFrame::from_candles(vec![
            candle(0, 10.0, 12.0),
            candle(1, 12.0, 12.0),
            candle(2, 12.0, 9.0),
        ])
        .unwrap();

        let directions: Vec<Direction> = frame.rows.iter().map(|r| r.direction).collect();
        assert_eq!(directions, vec![Direction::Green, Direction::Green, Direction::Red]);
        assert_eq!(frame.rows[2].delta, -3.0);
        assert_eq!(frame.max_volume(), 12.0);
    }

    #[test]
    fn indicator_columns_line_up_with_rows() {
        let candles: Vec<Candle> = (0..30).map(|h| candle(h, 100.0, 100.0 + (h % 5) as f64)).collect();
        let frame = CandleFrame::from_candles(candles).unwrap();

        assert!(frame.rows[5].ma7.is_none());
        assert!(frame.rows[6].ma7.is_some());
        assert!(frame.rows[18].ma20.is_none());
        assert!(frame.rows[19].ma20.is_some());
        assert!(frame.rows[13].rsi.is_none());
        assert!(frame.rows[14..].iter().all(|r| r.rsi.is_some()));
        assert!(frame.rows[25].macd.is_some());
        assert!(frame.rows[29].macd_signal.is_none());
    }

    #[test]
    fn empty_input_gives_empty_frame() {
        let frame = CandleFrame::from_candles(Vec::new()).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.max_volume(), 0.0);
    }
}
