//! Technical indicators over close/volume series (oldest value first).

use crate::analysis::stats;
use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;

/// RSI with Wilder smoothing. `None` when there are fewer than `period + 1` closes.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    rsi_series(closes, period).last().copied().flatten()
}

/// RSI value for every close; leading entries without enough history are `None`.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return out;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let p = period as f64;
    let mut avg_gain = gains / p;
    let mut avg_loss = losses / p;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, change.abs())
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Mean of the trailing `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    stats::mean(&values[values.len() - period..])
}

pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                None
            } else {
                stats::mean(&values[i + 1 - period..=i])
            }
        })
        .collect()
}

/// EMA seeded with the first value.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let k = 2.0 / (period as f64 + 1.0);
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            out.push(*v);
        } else {
            let prev = out[i - 1];
            out.push(v * k + prev * (1.0 - k));
        }
    }
    out
}

/// Last volume divided by the mean of the trailing `period` volumes.
pub fn volume_ratio(volumes: &[f64], period: usize) -> Option<f64> {
    let window = if volumes.len() >= period {
        &volumes[volumes.len() - period..]
    } else {
        volumes
    };
    let avg = stats::mean(window)?;
    if avg <= 0.0 {
        return None;
    }
    volumes.last().map(|v| v / avg)
}

/// Percent change between the close `lookback` bars ago (or the first bar) and the last close.
pub fn momentum(closes: &[f64], lookback: usize) -> Option<f64> {
    let last = *closes.last()?;
    let base_idx = closes.len().saturating_sub(lookback + 1);
    let base = closes[base_idx];
    if base == 0.0 {
        return None;
    }
    Some((last - base) / base * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();
    MacdSeries {
        macd: line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger(closes: &[f64], period: usize, width: f64) -> BollingerBands {
    let mut upper = Vec::with_capacity(closes.len());
    let mut middle = Vec::with_capacity(closes.len());
    let mut lower = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        if period == 0 || i + 1 < period {
            upper.push(None);
            middle.push(None);
            lower.push(None);
            continue;
        }
        let window = &closes[i + 1 - period..=i];
        let m = stats::mean(window);
        let sd = stats::std_dev(window);
        match (m, sd) {
            (Some(m), Some(sd)) => {
                upper.push(Some(m + width * sd));
                middle.push(Some(m));
                lower.push(Some(m - width * sd));
            }
            _ => {
                upper.push(None);
                middle.push(None);
                lower.push(None);
            }
        }
    }
    BollingerBands {
        upper,
        middle,
        lower,
    }
}

pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement levels measured down from the high of the range.
pub fn fibonacci_levels(high: f64, low: f64) -> Vec<FibonacciLevel> {
    let range = high - low;
    FIBONACCI_RATIOS
        .iter()
        .map(|&ratio| FibonacciLevel {
            ratio,
            price: high - range * ratio,
        })
        .collect()
}
