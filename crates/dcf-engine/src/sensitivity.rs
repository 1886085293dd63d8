//! Sensitivity of the implied share price to WACC and perpetual-growth
//! assumptions.
//!
//! Sweeps a grid of (WACC, g) pairs around a completed valuation, reusing
//! its cached discounted cash flows, and reports the resulting share-price
//! distribution.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use valuation_core::{Valuation, ValuationError};

/// Distribution summary over every grid cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Two-tailed implied-share-price band at one confidence level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Result of a sensitivity sweep: the price grid plus its summary
/// statistics. Not retained by the engine; purely a return value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub wacc_values: Vec<f64>,
    pub growth_values: Vec<f64>,
    /// Implied share price per (WACC row, growth column).
    pub grid: Vec<Vec<f64>>,
    pub summary: PriceSummary,
    pub confidence_bands: Vec<ConfidenceBand>,
}

impl SensitivityReport {
    pub fn price_at(&self, wacc_index: usize, growth_index: usize) -> Option<f64> {
        self.grid.get(wacc_index)?.get(growth_index).copied()
    }
}

/// Sweep WACC and growth over [value×(1−bound), value×(1+bound)) stepped by
/// value/100, recomputing the implied share price for every pair.
///
/// The bound and every confidence level must lie in (0, 1); violations
/// return `InvalidParameter` before any range is built.
pub fn sensitivity(
    valuation: &Valuation,
    confidence_levels: &[f64],
    bound: f64,
) -> Result<SensitivityReport, ValuationError> {
    if !(bound > 0.0 && bound < 1.0) {
        return Err(ValuationError::InvalidParameter(format!(
            "bound must be in (0, 1), got {bound}"
        )));
    }
    for &level in confidence_levels {
        if !(level > 0.0 && level < 1.0) {
            return Err(ValuationError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {level}"
            )));
        }
    }

    let last = valuation.discounted_fcf.last().copied().ok_or_else(|| {
        ValuationError::DataUnavailable("valuation holds no cash flows".to_string())
    })?;
    let npv_sum: f64 = valuation.discounted_fcf.iter().sum();
    let periods = valuation.discounted_fcf.len() as i32;

    let wacc_values = half_open_range(
        valuation.wacc * (1.0 - bound),
        valuation.wacc * (1.0 + bound),
        valuation.wacc / 100.0,
    );
    let growth_values = half_open_range(
        valuation.perpetual_growth_rate * (1.0 - bound),
        valuation.perpetual_growth_rate * (1.0 + bound),
        valuation.perpetual_growth_rate / 100.0,
    );

    let implied_price = |wacc: f64, growth: f64| {
        let terminal = last * (1.0 + growth) / (wacc - growth) / (1.0 + wacc).powi(periods);
        let enterprise_value = npv_sum + terminal;
        let equity_value =
            enterprise_value - valuation.total_debt + valuation.cash_and_equivalents;
        equity_value / valuation.shares_outstanding
    };

    let grid: Vec<Vec<f64>> = wacc_values
        .iter()
        .map(|&wacc| {
            growth_values
                .iter()
                .map(|&growth| implied_price(wacc, growth))
                .collect()
        })
        .collect();

    let mut prices: Vec<f64> = grid.iter().flatten().copied().collect();
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let summary = PriceSummary {
        min: prices.first().copied().unwrap_or(0.0),
        max: prices.last().copied().unwrap_or(0.0),
        mean: prices.as_slice().mean(),
        median: quantile_sorted(&prices, 0.5),
    };

    let confidence_bands = confidence_levels
        .iter()
        .map(|&level| {
            let significance = (1.0 - level) / 2.0;
            ConfidenceBand {
                level,
                lower: quantile_sorted(&prices, significance),
                upper: quantile_sorted(&prices, 1.0 - significance),
            }
        })
        .collect();

    Ok(SensitivityReport {
        wacc_values,
        growth_values,
        grid,
        summary,
        confidence_bands,
    })
}

/// [start, stop) stepped by `step`; element count ceil((stop − start) / step).
fn half_open_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let count = ((stop - start) / step).ceil();
    if !count.is_finite() || count <= 0.0 {
        return Vec::new();
    }

    (0..count as usize).map(|i| start + i as f64 * step).collect()
}

/// Linear-interpolated quantile over an ascending sample.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let position = (sorted.len() - 1) as f64 * q;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    sorted[below] + (sorted[above] - sorted[below]) * (position - below as f64)
}
