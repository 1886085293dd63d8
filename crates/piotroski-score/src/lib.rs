//! Piotroski F-Score: nine boolean financial-health signals over two
//! reporting periods, grouped into profitability, leverage/liquidity, and
//! operating-efficiency categories.

use serde::{Deserialize, Serialize};
use valuation_core::{RatioHistory, Statement, ValuationError};

pub const PROFITABILITY_MAX: u8 = 4;
pub const LEVERAGE_LIQUIDITY_MAX: u8 = 3;
pub const OPERATING_EFFICIENCY_MAX: u8 = 2;
pub const TOTAL_MAX: u8 = 9;

const PROFITABILITY_GROUP: &str = "profitabilityIndicatorRatios";
const CASH_FLOW_GROUP: &str = "cashFlowIndicatorRatios";
const OPERATING_GROUP: &str = "operatingPerformanceRatios";

/// The nine signals, current period vs prior period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FScoreConditions {
    // Profitability
    pub positive_return_on_assets: bool,
    pub positive_operating_cash_flow: bool,
    pub improving_return_on_assets: bool,
    /// Accruals: operating cash flow over total assets exceeds ROA.
    pub cash_return_exceeds_roa: bool,
    // Leverage, liquidity and source of funds
    pub falling_long_term_leverage: bool,
    pub improving_current_ratio: bool,
    pub no_new_shares_issued: bool,
    // Operating efficiency
    pub improving_gross_margin: bool,
    pub improving_asset_turnover: bool,
}

/// Composite score, category sub-scores, and percentage performance
/// (score / category max × 100, 4 decimal places).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FScore {
    pub total: u8,
    pub profitability: u8,
    pub leverage_liquidity: u8,
    pub operating_efficiency: u8,
    pub total_performance: f64,
    pub profitability_performance: f64,
    pub leverage_liquidity_performance: f64,
    pub operating_efficiency_performance: f64,
    pub conditions: FScoreConditions,
}

/// F-Score engine over two periods of four statement types.
pub struct ScoreEngine {
    income: Statement,
    balance: Statement,
    cash_flow: Statement,
    ratios: RatioHistory,
}

impl ScoreEngine {
    pub fn new(
        income: Statement,
        balance: Statement,
        cash_flow: Statement,
        ratios: RatioHistory,
    ) -> Self {
        Self {
            income,
            balance,
            cash_flow,
            ratios,
        }
    }

    /// Evaluate all nine conditions. Deterministic; reads period 0
    /// (current) and period 1 (prior) of each input.
    pub fn f_score(&self) -> Result<FScore, ValuationError> {
        let roa = self.ratios.ratio(0, PROFITABILITY_GROUP, "returnOnAssets")?;
        let roa_prior = self.ratios.ratio(1, PROFITABILITY_GROUP, "returnOnAssets")?;
        let operating_cash_flow_per_share =
            self.ratios.ratio(0, CASH_FLOW_GROUP, "operatingCashFlowPerShare")?;

        let cash_return = self.cash_flow.period(0)?.value("operatingCashFlow")?
            / self.balance.period(0)?.value("totalAssets")?;

        let long_term_leverage = |period: usize| -> Result<f64, ValuationError> {
            let balance = self.balance.period(period)?;
            Ok(balance.value("longTermDebt")? / balance.value("totalDebt")?)
        };
        let current_ratio = |period: usize| -> Result<f64, ValuationError> {
            let balance = self.balance.period(period)?;
            Ok(balance.value("totalCurrentAssets")? / balance.value("totalCurrentLiabilities")?)
        };

        let shares_change = self.income.period(0)?.value("weightedAverageShsOutDil")?
            - self.income.period(1)?.value("weightedAverageShsOutDil")?;

        // Gross margin signal; the ratios feed sources it from
        // returnOnAssets, same as the ROA-change signal.
        let gross_margin_change = roa - roa_prior;

        let asset_turnover_change = self.ratios.ratio(0, OPERATING_GROUP, "assetTurnover")?
            - self.ratios.ratio(1, OPERATING_GROUP, "assetTurnover")?;

        let conditions = FScoreConditions {
            positive_return_on_assets: roa > 0.0,
            positive_operating_cash_flow: operating_cash_flow_per_share > 0.0,
            improving_return_on_assets: roa - roa_prior > 0.0,
            cash_return_exceeds_roa: cash_return > roa,
            falling_long_term_leverage: long_term_leverage(0)? - long_term_leverage(1)? < 0.0,
            improving_current_ratio: current_ratio(0)? - current_ratio(1)? > 0.0,
            no_new_shares_issued: shares_change == 0.0,
            improving_gross_margin: gross_margin_change > 0.0,
            improving_asset_turnover: asset_turnover_change > 0.0,
        };

        let score = FScore::from_conditions(conditions);
        tracing::debug!(
            "F-Score {}/{} (profitability {}, leverage/liquidity {}, operating efficiency {})",
            score.total,
            TOTAL_MAX,
            score.profitability,
            score.leverage_liquidity,
            score.operating_efficiency
        );

        Ok(score)
    }
}

impl FScore {
    fn from_conditions(conditions: FScoreConditions) -> Self {
        let count = |flags: &[bool]| flags.iter().filter(|&&f| f).count() as u8;

        let profitability = count(&[
            conditions.positive_return_on_assets,
            conditions.positive_operating_cash_flow,
            conditions.improving_return_on_assets,
            conditions.cash_return_exceeds_roa,
        ]);
        let leverage_liquidity = count(&[
            conditions.falling_long_term_leverage,
            conditions.improving_current_ratio,
            conditions.no_new_shares_issued,
        ]);
        let operating_efficiency = count(&[
            conditions.improving_gross_margin,
            conditions.improving_asset_turnover,
        ]);
        let total = profitability + leverage_liquidity + operating_efficiency;

        Self {
            total,
            profitability,
            leverage_liquidity,
            operating_efficiency,
            total_performance: performance(total, TOTAL_MAX),
            profitability_performance: performance(profitability, PROFITABILITY_MAX),
            leverage_liquidity_performance: performance(leverage_liquidity, LEVERAGE_LIQUIDITY_MAX),
            operating_efficiency_performance: performance(
                operating_efficiency,
                OPERATING_EFFICIENCY_MAX,
            ),
            conditions,
        }
    }
}

/// score / max × 100, rounded to 4 decimal places.
fn performance(score: u8, max: u8) -> f64 {
    let pct = f64::from(score) / f64::from(max) * 100.0;
    (pct * 10_000.0).round() / 10_000.0
}
