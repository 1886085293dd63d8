use async_trait::async_trait;

use crate::ValuationError;

/// Point-in-time market data the valuation engine cannot derive from
/// statements: the risk-free yield, the index annual return behind the
/// market risk premium, and the company beta.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent short-term government-bond yield, as a fraction.
    async fn risk_free_rate(&self) -> Result<f64, ValuationError>;

    /// Trailing one-year return of the reference equity index:
    /// latest level / level 252 trading observations prior, minus one.
    async fn market_annual_return(&self) -> Result<f64, ValuationError>;

    /// The company's beta coefficient.
    async fn beta(&self, ticker: &str) -> Result<f64, ValuationError>;
}
