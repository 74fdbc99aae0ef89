// src/analysis/indicators.rs
use crate::domain::errors::{AnalysisError, AnalysisResult};
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};
use ta::Next;

/// One value per input point; `None` where the indicator is not yet defined
pub type Series = Vec<Option<f64>>;

fn check_period(name: &str, period: usize) -> AnalysisResult<()> {
    if period == 0 {
        return Err(AnalysisError::InvalidPeriod(format!("{} period must be positive", name)));
    }
    Ok(())
}

/// Trailing arithmetic mean over `window` points, defined from index `window - 1`
pub fn moving_average(values: &[f64], window: usize) -> AnalysisResult<Series> {
    check_period("SMA", window)?;

    let mut sma = SimpleMovingAverage::new(window)
        .map_err(|e| AnalysisError::InvalidPeriod(format!("SMA({}): {:?}", window, e)))?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let mean = sma.next(value);
            (i + 1 >= window).then_some(mean)
        })
        .collect())
}

/// Exponential moving average with `alpha = 2 / (span + 1)`.
///
/// Seeded by the first defined input and reported once `span` inputs have
/// been seen. Undefined inputs produce undefined outputs and do not advance
/// the average.
pub fn exponential_moving_average(values: &[Option<f64>], span: usize) -> AnalysisResult<Series> {
    check_period("EMA", span)?;

    let mut ema = ExponentialMovingAverage::new(span)
        .map_err(|e| AnalysisError::InvalidPeriod(format!("EMA({}): {:?}", span, e)))?;
    let mut seen = 0usize;

    Ok(values
        .iter()
        .map(|value| {
            let value = (*value)?;
            let current = ema.next(value);
            seen += 1;
            (seen >= span).then_some(current)
        })
        .collect())
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value sits at index `period`, seeded by the plain average of the
/// first `period` gains and losses. A window with no losses reads 100.
/// An exponential average seeded with the first change alone (as the pandas
/// `ta` package does) starts at the same index but gives different early values.
pub fn relative_strength_index(values: &[f64], period: usize) -> AnalysisResult<Series> {
    check_period("RSI", period)?;

    let mut result = vec![None; values.len()];
    if values.len() <= period {
        return Ok(result);
    }

    let rsi = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };

    let changes: Vec<(f64, f64)> = values
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.0).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| c.1).sum::<f64>() / period as f64;
    result[period] = Some(rsi(avg_gain, avg_loss));

    for (i, &(gain, loss)) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        result[i + 1] = Some(rsi(avg_gain, avg_loss));
    }

    Ok(result)
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

/// MACD line = EMA(fast) - EMA(slow); signal = EMA(signal) of the line
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> AnalysisResult<Macd> {
    if fast >= slow {
        return Err(AnalysisError::InvalidPeriod(format!(
            "MACD fast period {} must be shorter than slow period {}",
            fast, slow
        )));
    }

    let inputs: Series = values.iter().copied().map(Some).collect();
    let fast_ema = exponential_moving_average(&inputs, fast)?;
    let slow_ema = exponential_moving_average(&inputs, slow)?;

    let line: Series = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal_line = exponential_moving_average(&line, signal)?;

    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    Ok(Macd {
        line,
        signal: signal_line,
        histogram,
    })
}
