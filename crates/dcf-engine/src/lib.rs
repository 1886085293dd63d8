//! Discounted-cash-flow valuation over fetched financial statements.
//!
//! The computation is staged: each step returns an immutable value the next
//! step consumes, so the required ordering (rates before cash flows before
//! equity value) is enforced by the types rather than by call discipline.

use valuation_core::{
    GrowthAssumptions, MarketDataProvider, StatementSet, Valuation, ValuationError,
};

pub mod sensitivity;
pub mod spread;

pub use sensitivity::{sensitivity, ConfidenceBand, PriceSummary, SensitivityReport};
pub use spread::{credit_spread, synthetic_rating};

/// Year-over-year decay applied to the change in working capital during
/// the forecast. Compounds; never reset to the base value.
const WORKING_CAPITAL_DECAY: f64 = 0.7;

/// Macro inputs gathered before any rate can be computed.
#[derive(Debug, Clone, Copy)]
pub struct MacroInputs {
    pub risk_free_rate: f64,
    pub interest_coverage: f64,
}

/// Discount rates derived from macro inputs and the capital structure.
#[derive(Debug, Clone, Copy)]
pub struct DiscountRates {
    pub risk_free_rate: f64,
    pub interest_coverage: f64,
    pub cost_of_debt: f64,
    pub cost_of_equity: f64,
    pub effective_tax_rate: f64,
    pub wacc: f64,
}

/// Projected free cash flows discounted to present value, plus the
/// resulting enterprise value.
#[derive(Debug, Clone)]
pub struct CashFlowForecast {
    /// Index 0 is the undiscounted base year; indices 1..=N the discounted
    /// forecast years. The base year is included in the NPV sum.
    pub discounted_fcf: Vec<f64>,
    pub perpetual_growth_rate: f64,
    pub enterprise_value: f64,
}

/// DCF valuation engine over one company's statement set.
pub struct DcfEngine {
    statements: StatementSet,
    ticker: String,
    forecast_years: u32,
}

impl DcfEngine {
    pub fn new(statements: StatementSet, ticker: impl Into<String>, forecast_years: u32) -> Self {
        Self {
            statements,
            ticker: ticker.into(),
            forecast_years,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Interest coverage ratio: (EBITDA − D&A) / interest expense, from the
    /// most recent income-statement period.
    pub fn interest_coverage(&self) -> Result<f64, ValuationError> {
        let income = self.statements.income.period(0)?;
        let ebit = income.value("ebitda")? - income.value("depreciationAndAmortization")?;
        let interest_expense = income.value("interestExpense")?;

        if interest_expense == 0.0 {
            return Err(ValuationError::DataUnavailable(format!(
                "{}: interest expense is zero, coverage ratio undefined",
                self.ticker
            )));
        }

        Ok(ebit / interest_expense)
    }

    /// Stage 1: risk-free rate and interest coverage.
    pub async fn macro_inputs(
        &self,
        market: &dyn MarketDataProvider,
    ) -> Result<MacroInputs, ValuationError> {
        let interest_coverage = self.interest_coverage()?;
        let risk_free_rate = market.risk_free_rate().await?;
        tracing::debug!(
            "{}: interest coverage {:.4}, risk-free rate {:.4}",
            self.ticker,
            interest_coverage,
            risk_free_rate
        );

        Ok(MacroInputs {
            risk_free_rate,
            interest_coverage,
        })
    }

    /// Stage 2: cost of debt = risk-free rate + synthetic-rating credit
    /// spread.
    pub fn cost_of_debt(&self, inputs: &MacroInputs) -> f64 {
        inputs.risk_free_rate + credit_spread(inputs.interest_coverage)
    }

    /// Stage 3: CAPM cost of equity from the company beta and the trailing
    /// index annual return.
    pub async fn cost_of_equity(
        &self,
        market: &dyn MarketDataProvider,
        inputs: &MacroInputs,
    ) -> Result<f64, ValuationError> {
        let beta = market.beta(&self.ticker).await?;
        let market_return = market.market_annual_return().await?;
        Ok(inputs.risk_free_rate + beta * (market_return - inputs.risk_free_rate))
    }

    /// Stage 4: WACC from the quarterly capital structure and the effective
    /// tax rate.
    pub fn discount_rates(
        &self,
        inputs: MacroInputs,
        cost_of_debt: f64,
        cost_of_equity: f64,
    ) -> Result<DiscountRates, ValuationError> {
        let effective_tax_rate =
            self.statements
                .ratios
                .ratio(0, "profitabilityIndicatorRatios", "effectiveTaxRate")?;

        let quarter = self.statements.balance_quarterly.period(0)?;
        let total_debt = quarter.value("totalDebt")?;
        let equity = quarter.value("totalStockholdersEquity")?;
        let capital = total_debt + equity;
        let debt_proportion = total_debt / capital;
        let equity_proportion = equity / capital;

        let wacc = cost_of_debt * (1.0 - effective_tax_rate) * debt_proportion
            + cost_of_equity * equity_proportion;

        Ok(DiscountRates {
            risk_free_rate: inputs.risk_free_rate,
            interest_coverage: inputs.interest_coverage,
            cost_of_debt,
            cost_of_equity,
            effective_tax_rate,
            wacc,
        })
    }

    /// Stages 5–6: project unlevered free cash flow, discount each forecast
    /// year by WACC, and add the discounted terminal value.
    ///
    /// Growth applies linearly (1 + yr × rate each year, not compounded) and
    /// the terminal value discounts by (1 + WACC)^(1 + N). A WACC at or
    /// below the perpetual growth rate yields a non-finite enterprise value
    /// which is returned as-is.
    pub fn forecast_cash_flows(
        &self,
        rates: &DiscountRates,
        assumptions: GrowthAssumptions,
    ) -> Result<CashFlowForecast, ValuationError> {
        let income = self.statements.income.period(0)?;
        let cash_flow = self.statements.cash_flow.period(0)?;

        let mut ebit = income.value("ebitda")? - income.value("depreciationAndAmortization")?;
        let mut non_cash_charges = cash_flow.value("depreciationAndAmortization")?;
        let mut working_capital_change = cash_flow.value("changeInWorkingCapital")?;
        let mut capex = cash_flow.value("capitalExpenditure")?;
        let after_tax = 1.0 - rates.effective_tax_rate;

        let base = ebit * after_tax + non_cash_charges + working_capital_change + capex;
        let mut discounted_fcf = vec![base];

        for yr in 1..=self.forecast_years {
            ebit *= 1.0 + yr as f64 * assumptions.earnings;
            non_cash_charges *= 1.0 + yr as f64 * assumptions.earnings;
            capex *= 1.0 + yr as f64 * assumptions.capex;
            working_capital_change *= WORKING_CAPITAL_DECAY;

            let fcf = ebit * after_tax + non_cash_charges + working_capital_change + capex;
            discounted_fcf.push(fcf / (1.0 + rates.wacc).powi(yr as i32));
        }

        let npv_sum: f64 = discounted_fcf.iter().sum();
        let last = discounted_fcf.last().copied().unwrap_or(base);
        let terminal_value =
            last * (1.0 + assumptions.perpetual) / (rates.wacc - assumptions.perpetual);
        let discounted_terminal =
            terminal_value / (1.0 + rates.wacc).powi(1 + self.forecast_years as i32);

        Ok(CashFlowForecast {
            discounted_fcf,
            perpetual_growth_rate: assumptions.perpetual,
            enterprise_value: npv_sum + discounted_terminal,
        })
    }

    /// Stage 7: equity value and implied share price from the most recent
    /// enterprise-value record.
    pub fn equity_value(
        &self,
        rates: &DiscountRates,
        forecast: CashFlowForecast,
    ) -> Result<Valuation, ValuationError> {
        let latest = self.statements.enterprise_value.period(0)?;
        let total_debt = latest.value("+ Total Debt")?;
        let cash_and_equivalents = latest.value("- Cash & Cash Equivalents")?;
        let shares_outstanding = latest.value("Number of Shares")?;

        let equity_value = forecast.enterprise_value - total_debt + cash_and_equivalents;
        let implied_share_price = equity_value / shares_outstanding;

        Ok(Valuation {
            ticker: self.ticker.clone(),
            forecast_years: self.forecast_years,
            risk_free_rate: rates.risk_free_rate,
            interest_coverage: rates.interest_coverage,
            cost_of_debt: rates.cost_of_debt,
            cost_of_equity: rates.cost_of_equity,
            effective_tax_rate: rates.effective_tax_rate,
            wacc: rates.wacc,
            discounted_fcf: forecast.discounted_fcf,
            perpetual_growth_rate: forecast.perpetual_growth_rate,
            enterprise_value: forecast.enterprise_value,
            total_debt,
            cash_and_equivalents,
            shares_outstanding,
            equity_value,
            implied_share_price,
        })
    }

    /// Run all stages in order.
    pub async fn run(
        &self,
        market: &dyn MarketDataProvider,
        assumptions: GrowthAssumptions,
    ) -> Result<Valuation, ValuationError> {
        let inputs = self.macro_inputs(market).await?;
        let cost_of_debt = self.cost_of_debt(&inputs);
        let cost_of_equity = self.cost_of_equity(market, &inputs).await?;
        let rates = self.discount_rates(inputs, cost_of_debt, cost_of_equity)?;
        let forecast = self.forecast_cash_flows(&rates, assumptions)?;
        let valuation = self.equity_value(&rates, forecast)?;

        tracing::info!(
            "{}: rating {}, WACC {:.4}, implied share price {:.4}",
            self.ticker,
            synthetic_rating(valuation.interest_coverage),
            valuation.wacc,
            valuation.implied_share_price
        );

        Ok(valuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use valuation_core::{EnterpriseValues, RatioHistory, Statement};

    struct FixedMarket {
        risk_free_rate: f64,
        market_return: f64,
        beta: f64,
    }

    #[async_trait]
    impl MarketDataProvider for FixedMarket {
        async fn risk_free_rate(&self) -> Result<f64, ValuationError> {
            Ok(self.risk_free_rate)
        }

        async fn market_annual_return(&self) -> Result<f64, ValuationError> {
            Ok(self.market_return)
        }

        async fn beta(&self, _ticker: &str) -> Result<f64, ValuationError> {
            Ok(self.beta)
        }
    }

    fn fixture_statements(interest_expense: f64) -> StatementSet {
        let income: Statement = serde_json::from_value(json!([{
            "ebitda": 1000.0,
            "depreciationAndAmortization": 100.0,
            "interestExpense": interest_expense,
        }]))
        .unwrap();
        let cash_flow: Statement = serde_json::from_value(json!([{
            "depreciationAndAmortization": 100.0,
            "changeInWorkingCapital": -20.0,
            "capitalExpenditure": -150.0,
            "operatingCashFlow": 800.0,
        }]))
        .unwrap();
        let balance_quarterly: Statement = serde_json::from_value(json!([{
            "totalDebt": 400.0,
            "totalStockholdersEquity": 600.0,
        }]))
        .unwrap();
        let enterprise_value: EnterpriseValues = serde_json::from_value(json!({
            "symbol": "TEST",
            "enterpriseValues": [{
                "+ Total Debt": 400.0,
                "- Cash & Cash Equivalents": 250.0,
                "Number of Shares": 100.0,
            }]
        }))
        .unwrap();
        let ratios: RatioHistory = serde_json::from_value(json!({
            "symbol": "TEST",
            "ratios": [{
                "profitabilityIndicatorRatios": { "effectiveTaxRate": "0.2" }
            }]
        }))
        .unwrap();

        StatementSet {
            income,
            balance: Statement::default(),
            balance_quarterly,
            cash_flow,
            enterprise_value,
            ratios,
        }
    }

    fn engine(forecast_years: u32) -> DcfEngine {
        DcfEngine::new(fixture_statements(50.0), "TEST", forecast_years)
    }

    #[test]
    fn coverage_and_cost_of_debt_match_worked_example() {
        // EBIT 900 / interest 50 => coverage 18 => AAA spread 0.0063.
        let engine = engine(4);
        let coverage = engine.interest_coverage().unwrap();
        assert_eq!(coverage, 18.0);

        let inputs = MacroInputs {
            risk_free_rate: 0.02,
            interest_coverage: coverage,
        };
        assert!((engine.cost_of_debt(&inputs) - 0.0263).abs() < 1e-12);
    }

    #[test]
    fn zero_interest_expense_is_data_unavailable() {
        let engine = DcfEngine::new(fixture_statements(0.0), "TEST", 4);
        let err = engine.interest_coverage().unwrap_err();
        assert!(matches!(err, ValuationError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn capm_follows_risk_free_beta_and_market_return() {
        let engine = engine(4);
        let market = FixedMarket {
            risk_free_rate: 0.02,
            market_return: 0.10,
            beta: 1.5,
        };
        let inputs = engine.macro_inputs(&market).await.unwrap();
        let capm = engine.cost_of_equity(&market, &inputs).await.unwrap();

        // 0.02 + 1.5 * (0.10 - 0.02)
        assert!((capm - 0.14).abs() < 1e-12);
    }

    #[test]
    fn wacc_weights_debt_and_equity_proportions() {
        let engine = engine(4);
        let inputs = MacroInputs {
            risk_free_rate: 0.02,
            interest_coverage: 18.0,
        };
        let rates = engine.discount_rates(inputs, 0.0263, 0.14).unwrap();

        // 0.0263 * 0.8 * 0.4 + 0.14 * 0.6
        let expected = 0.0263 * (1.0 - 0.2) * 0.4 + 0.14 * 0.6;
        assert!((rates.wacc - expected).abs() < 1e-12);
        assert_eq!(rates.effective_tax_rate, 0.2);
    }

    #[test]
    fn zero_horizon_forecast_is_just_the_base_year() {
        let engine = engine(0);
        let rates = DiscountRates {
            risk_free_rate: 0.02,
            interest_coverage: 18.0,
            cost_of_debt: 0.0263,
            cost_of_equity: 0.14,
            effective_tax_rate: 0.2,
            wacc: 0.10,
        };
        let assumptions = GrowthAssumptions {
            earnings: 0.1,
            capex: 0.05,
            perpetual: 0.02,
        };
        let forecast = engine.forecast_cash_flows(&rates, assumptions).unwrap();

        // Base ULFCF = 900 * 0.8 + 100 - 20 - 150
        let base = 900.0 * 0.8 + 100.0 - 20.0 - 150.0;
        assert_eq!(forecast.discounted_fcf, vec![base]);
    }

    #[test]
    fn forecast_applies_linear_growth_and_working_capital_decay() {
        let engine = engine(2);
        let rates = DiscountRates {
            risk_free_rate: 0.02,
            interest_coverage: 18.0,
            cost_of_debt: 0.0263,
            cost_of_equity: 0.14,
            effective_tax_rate: 0.2,
            wacc: 0.10,
        };
        let assumptions = GrowthAssumptions {
            earnings: 0.1,
            capex: 0.05,
            perpetual: 0.02,
        };
        let forecast = engine.forecast_cash_flows(&rates, assumptions).unwrap();
        assert_eq!(forecast.discounted_fcf.len(), 3);

        // Year 1: scale by (1 + 1*rate), discount by 1.1.
        let y1 = (900.0 * 1.1 * 0.8 + 100.0 * 1.1 + (-20.0 * 0.7) + (-150.0 * 1.05)) / 1.1;
        assert!((forecast.discounted_fcf[1] - y1).abs() < 1e-9);

        // Year 2: scale year-1 values again by (1 + 2*rate), decay working
        // capital once more, discount by 1.1^2.
        let y2 = (900.0 * 1.1 * 1.2 * 0.8
            + 100.0 * 1.1 * 1.2
            + (-20.0 * 0.7 * 0.7)
            + (-150.0 * 1.05 * 1.1))
            / 1.1f64.powi(2);
        assert!((forecast.discounted_fcf[2] - y2).abs() < 1e-9);
    }

    #[test]
    fn enterprise_value_monotonic_in_wacc_and_growth() {
        let engine = engine(4);
        let assumptions = |perpetual| GrowthAssumptions {
            earnings: 0.1,
            capex: 0.05,
            perpetual,
        };
        let rates = |wacc| DiscountRates {
            risk_free_rate: 0.02,
            interest_coverage: 18.0,
            cost_of_debt: 0.0263,
            cost_of_equity: 0.14,
            effective_tax_rate: 0.2,
            wacc,
        };

        // Decreasing in WACC, growth fixed.
        let ev_at = |wacc| {
            engine
                .forecast_cash_flows(&rates(wacc), assumptions(0.02))
                .unwrap()
                .enterprise_value
        };
        assert!(ev_at(0.08) > ev_at(0.10));
        assert!(ev_at(0.10) > ev_at(0.12));

        // Increasing in growth, WACC fixed.
        let ev_growth = |perpetual| {
            engine
                .forecast_cash_flows(&rates(0.10), assumptions(perpetual))
                .unwrap()
                .enterprise_value
        };
        assert!(ev_growth(0.01) < ev_growth(0.02));
        assert!(ev_growth(0.02) < ev_growth(0.03));
    }

    #[test]
    fn wacc_at_perpetual_growth_yields_non_finite_value() {
        let engine = engine(4);
        let rates = DiscountRates {
            risk_free_rate: 0.02,
            interest_coverage: 18.0,
            cost_of_debt: 0.0263,
            cost_of_equity: 0.14,
            effective_tax_rate: 0.2,
            wacc: 0.02,
        };
        let assumptions = GrowthAssumptions {
            earnings: 0.1,
            capex: 0.05,
            perpetual: 0.02,
        };
        let forecast = engine.forecast_cash_flows(&rates, assumptions).unwrap();
        assert!(!forecast.enterprise_value.is_finite());
    }

    #[tokio::test]
    async fn full_run_threads_every_stage() {
        let engine = engine(4);
        let market = FixedMarket {
            risk_free_rate: 0.02,
            market_return: 0.10,
            beta: 1.2,
        };
        let assumptions = GrowthAssumptions {
            earnings: 0.1,
            capex: 0.05,
            perpetual: 0.02,
        };
        let valuation = engine.run(&market, assumptions).await.unwrap();

        assert_eq!(valuation.ticker, "TEST");
        assert_eq!(valuation.interest_coverage, 18.0);
        assert!((valuation.cost_of_debt - 0.0263).abs() < 1e-12);
        assert_eq!(valuation.discounted_fcf.len(), 5);
        assert_eq!(valuation.total_debt, 400.0);
        assert_eq!(valuation.cash_and_equivalents, 250.0);
        assert_eq!(
            valuation.equity_value,
            valuation.enterprise_value - 400.0 + 250.0
        );
        assert_eq!(
            valuation.implied_share_price,
            valuation.equity_value / 100.0
        );
    }
}
