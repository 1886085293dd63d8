use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;
use valuation_core::ValuationError;

const FRED_CSV_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

/// 1-year treasury constant-maturity yield, in percent.
pub const TREASURY_SERIES: &str = "TB1YR";

/// S&P 500 index level.
pub const INDEX_SERIES: &str = "SP500";

/// Trading observations per year, used for the trailing annual return.
const TRADING_DAYS_PER_YEAR: usize = 252;

/// One dated value of a FRED series.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Read-only client for FRED's CSV export endpoint. No API key required.
#[derive(Clone)]
pub struct FredClient {
    client: Client,
}

impl FredClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Fetch a series, oldest observation first. Missing observations
    /// (published as ".") are dropped.
    pub async fn series(&self, series_id: &str) -> Result<Vec<Observation>, ValuationError> {
        tracing::debug!("fetching FRED series {}", series_id);
        let response = self
            .client
            .get(FRED_CSV_URL)
            .query(&[("id", series_id)])
            .send()
            .await
            .map_err(|e| ValuationError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ValuationError::ApiError(format!(
                "HTTP {} fetching FRED series {series_id}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ValuationError::ApiError(e.to_string()))?;

        Ok(parse_series(&body))
    }

    /// Most recent value of a series.
    pub async fn latest(&self, series_id: &str) -> Result<f64, ValuationError> {
        let observations = self.series(series_id).await?;
        observations
            .last()
            .map(|o| o.value)
            .ok_or_else(|| {
                ValuationError::DataUnavailable(format!("FRED series {series_id} returned no data"))
            })
    }

    /// Trailing one-year return: latest value over the value 252
    /// observations prior, minus one.
    pub async fn annual_return(&self, series_id: &str) -> Result<f64, ValuationError> {
        let observations = self.series(series_id).await?;
        if observations.len() < TRADING_DAYS_PER_YEAR {
            return Err(ValuationError::DataUnavailable(format!(
                "FRED series {series_id} has {} observation(s), {} required",
                observations.len(),
                TRADING_DAYS_PER_YEAR
            )));
        }

        let latest = observations[observations.len() - 1].value;
        let prior = observations[observations.len() - TRADING_DAYS_PER_YEAR].value;
        Ok(latest / prior - 1.0)
    }
}

impl Default for FredClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a fredgraph CSV body: header line, then `date,value` rows with
/// "." for missing values.
fn parse_series(body: &str) -> Vec<Observation> {
    body.lines()
        .skip(1)
        .filter_map(|line| {
            let (date, value) = line.split_once(',')?;
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
            let value: f64 = value.trim().parse().ok()?;
            Some(Observation { date, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_and_drops_missing_observations() {
        let body = "DATE,TB1YR\n2024-01-01,4.80\n2024-02-01,.\n2024-03-01,4.95\n";
        let observations = parse_series(body);

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].value, 4.80);
        assert_eq!(observations[1].value, 4.95);
        assert_eq!(
            observations[1].date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn empty_series_parses_to_no_observations() {
        let body = "DATE,SP500\n";
        assert!(parse_series(body).is_empty());
    }
}
