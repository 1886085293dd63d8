use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use valuation_core::{
    EnterpriseValues, MarketDataProvider, RatioHistory, Statement, StatementPeriod, StatementSet,
    ValuationError,
};

pub mod fred;

pub use fred::{FredClient, INDEX_SERIES, TREASURY_SERIES};

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Statement endpoints exposed by the Financial Modeling Prep API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    EnterpriseValue,
    FinancialRatios,
}

impl StatementKind {
    pub fn as_path(&self) -> &'static str {
        match self {
            StatementKind::IncomeStatement => "income-statement",
            StatementKind::BalanceSheet => "balance-sheet-statement",
            StatementKind::CashFlow => "cash-flow-statement",
            StatementKind::EnterpriseValue => "enterprise-value",
            StatementKind::FinancialRatios => "financial-ratios",
        }
    }
}

/// Reporting frequency of a statement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Annual,
    Quarter,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarter => "quarter",
        }
    }
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    profile: StatementPeriod,
}

/// Financial Modeling Prep client for statements and company profiles.
#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    client: Client,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { api_key, client }
    }

    /// Fetch a JSON endpoint with automatic 429 retry.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ValuationError> {
        let url = format!("{BASE_URL}/{path}");

        for attempt in 0..3u32 {
            let response = self
                .client
                .get(&url)
                .query(query)
                .query(&[("apikey", self.api_key.as_str())])
                .send()
                .await
                .map_err(|e| ValuationError::ApiError(e.to_string()))?;

            if response.status().as_u16() == 429 {
                let wait_secs = 15u64;
                tracing::warn!(
                    "FMP 429 rate limited, waiting {}s before retry {}/3",
                    wait_secs,
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(ValuationError::ApiError(format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                )));
            }

            return response
                .json()
                .await
                .map_err(|e| ValuationError::ApiError(e.to_string()));
        }

        Err(ValuationError::ApiError(
            "Rate limited by FMP after 3 retries".to_string(),
        ))
    }

    async fn statement(
        &self,
        ticker: &str,
        kind: StatementKind,
        frequency: Frequency,
    ) -> Result<Statement, ValuationError> {
        tracing::debug!("fetching {} for {} ({})", kind.as_path(), ticker, frequency.as_str());
        self.fetch(
            &format!("{}/{}", kind.as_path(), ticker),
            &[("period", frequency.as_str())],
        )
        .await
    }

    /// Income statement, most recent period first.
    pub async fn income_statement(
        &self,
        ticker: &str,
        frequency: Frequency,
    ) -> Result<Statement, ValuationError> {
        self.statement(ticker, StatementKind::IncomeStatement, frequency).await
    }

    /// Balance sheet statement, most recent period first.
    pub async fn balance_sheet(
        &self,
        ticker: &str,
        frequency: Frequency,
    ) -> Result<Statement, ValuationError> {
        self.statement(ticker, StatementKind::BalanceSheet, frequency).await
    }

    /// Cash flow statement, most recent period first.
    pub async fn cash_flow(
        &self,
        ticker: &str,
        frequency: Frequency,
    ) -> Result<Statement, ValuationError> {
        self.statement(ticker, StatementKind::CashFlow, frequency).await
    }

    /// Enterprise value statement (debt, cash, share count per period).
    pub async fn enterprise_value(&self, ticker: &str) -> Result<EnterpriseValues, ValuationError> {
        tracing::debug!("fetching enterprise value for {}", ticker);
        self.fetch(
            &format!("{}/{}", StatementKind::EnterpriseValue.as_path(), ticker),
            &[],
        )
        .await
    }

    /// Financial ratios history, grouped by ratio category.
    pub async fn financial_ratios(&self, ticker: &str) -> Result<RatioHistory, ValuationError> {
        tracing::debug!("fetching financial ratios for {}", ticker);
        self.fetch(
            &format!("{}/{}", StatementKind::FinancialRatios.as_path(), ticker),
            &[],
        )
        .await
    }

    /// Fetch the six statement collections a DCF valuation consumes.
    pub async fn statement_set(&self, ticker: &str) -> Result<StatementSet, ValuationError> {
        tracing::info!("fetching statement set for {}", ticker);
        Ok(StatementSet {
            income: self.income_statement(ticker, Frequency::Annual).await?,
            balance: self.balance_sheet(ticker, Frequency::Annual).await?,
            balance_quarterly: self.balance_sheet(ticker, Frequency::Quarter).await?,
            cash_flow: self.cash_flow(ticker, Frequency::Annual).await?,
            enterprise_value: self.enterprise_value(ticker).await?,
            ratios: self.financial_ratios(ticker).await?,
        })
    }

    /// The company's beta coefficient from the profile endpoint.
    pub async fn company_beta(&self, ticker: &str) -> Result<f64, ValuationError> {
        let response: ProfileResponse =
            self.fetch(&format!("company/profile/{ticker}"), &[]).await?;
        response.profile.value("beta")
    }
}

/// Production [`MarketDataProvider`]: beta from the FMP profile endpoint,
/// risk-free rate and index return from FRED series.
#[derive(Clone)]
pub struct FmpMarketData {
    fmp: FmpClient,
    fred: FredClient,
}

impl FmpMarketData {
    pub fn new(api_key: String) -> Self {
        Self {
            fmp: FmpClient::new(api_key),
            fred: FredClient::new(),
        }
    }

    pub fn fmp(&self) -> &FmpClient {
        &self.fmp
    }
}

#[async_trait]
impl MarketDataProvider for FmpMarketData {
    async fn risk_free_rate(&self) -> Result<f64, ValuationError> {
        // The treasury series publishes yields in percent.
        Ok(self.fred.latest(TREASURY_SERIES).await? / 100.0)
    }

    async fn market_annual_return(&self) -> Result<f64, ValuationError> {
        self.fred.annual_return(INDEX_SERIES).await
    }

    async fn beta(&self, ticker: &str) -> Result<f64, ValuationError> {
        self.fmp.company_beta(ticker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_payload_deserializes_most_recent_first() {
        let body = r#"[
            {"date": "2023-12-31", "ebitda": 1000.0, "interestExpense": 50.0},
            {"date": "2022-12-31", "ebitda": 900.0, "interestExpense": 60.0}
        ]"#;
        let statement: Statement = serde_json::from_str(body).unwrap();

        assert_eq!(statement.len(), 2);
        assert_eq!(statement.period(0).unwrap().get("ebitda"), Some(1000.0));
        assert_eq!(statement.period(1).unwrap().get("interestExpense"), Some(60.0));
    }

    #[test]
    fn profile_beta_accepts_string_values() {
        let body = r#"{"symbol": "AAPL", "profile": {"beta": "1.18", "price": 190.0}}"#;
        let response: ProfileResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.profile.value("beta").unwrap(), 1.18);
    }

    #[test]
    fn enterprise_value_payload_keeps_display_keys() {
        let body = r#"{
            "symbol": "AAPL",
            "enterpriseValues": [
                {"+ Total Debt": 100.0, "- Cash & Cash Equivalents": 40.0, "Number of Shares": 10.0}
            ]
        }"#;
        let ev: EnterpriseValues = serde_json::from_str(body).unwrap();

        let latest = ev.period(0).unwrap();
        assert_eq!(latest.value("+ Total Debt").unwrap(), 100.0);
        assert_eq!(latest.value("Number of Shares").unwrap(), 10.0);
    }
}
