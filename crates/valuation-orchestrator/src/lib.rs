//! Wires the statement fetcher and the three engines into single-call
//! analysis runs. Stateless: statements are fetched fresh per run and
//! nothing is cached across invocations.

use dcf_engine::{sensitivity, DcfEngine, SensitivityReport};
use fmp_client::{FmpClient, FmpMarketData, Frequency};
use piotroski_score::{FScore, ScoreEngine};
use serde::{Deserialize, Serialize};
use valuation_core::{GrowthAssumptions, Valuation, ValuationError};

/// Combined output of one full analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub valuation: Valuation,
    pub sensitivity: SensitivityReport,
    pub f_score: FScore,
}

pub struct ValuationOrchestrator {
    market: FmpMarketData,
}

impl ValuationOrchestrator {
    pub fn new(api_key: String) -> Self {
        Self {
            market: FmpMarketData::new(api_key),
        }
    }

    fn fmp(&self) -> &FmpClient {
        self.market.fmp()
    }

    /// DCF valuation only.
    pub async fn value(
        &self,
        ticker: &str,
        forecast_years: u32,
        assumptions: GrowthAssumptions,
    ) -> Result<Valuation, ValuationError> {
        let statements = self.fmp().statement_set(ticker).await?;
        let engine = DcfEngine::new(statements, ticker, forecast_years);
        engine.run(&self.market, assumptions).await
    }

    /// Piotroski F-Score only; fetches just the four statements it reads.
    pub async fn score(&self, ticker: &str) -> Result<FScore, ValuationError> {
        let income = self.fmp().income_statement(ticker, Frequency::Annual).await?;
        let balance = self.fmp().balance_sheet(ticker, Frequency::Annual).await?;
        let cash_flow = self.fmp().cash_flow(ticker, Frequency::Annual).await?;
        let ratios = self.fmp().financial_ratios(ticker).await?;

        ScoreEngine::new(income, balance, cash_flow, ratios).f_score()
    }

    /// Full run: valuation, sensitivity sweep, and F-Score.
    pub async fn analyze(
        &self,
        ticker: &str,
        forecast_years: u32,
        assumptions: GrowthAssumptions,
        confidence_levels: &[f64],
        bound: f64,
    ) -> Result<AnalysisReport, ValuationError> {
        tracing::info!("analyzing {} over a {}-year horizon", ticker, forecast_years);

        let statements = self.fmp().statement_set(ticker).await?;
        let score_engine = ScoreEngine::new(
            statements.income.clone(),
            statements.balance.clone(),
            statements.cash_flow.clone(),
            statements.ratios.clone(),
        );

        let engine = DcfEngine::new(statements, ticker, forecast_years);
        let valuation = engine.run(&self.market, assumptions).await?;
        let sensitivity = sensitivity(&valuation, confidence_levels, bound)?;
        let f_score = score_engine.f_score()?;

        Ok(AnalysisReport {
            valuation,
            sensitivity,
            f_score,
        })
    }
}
