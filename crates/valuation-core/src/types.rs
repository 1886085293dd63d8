use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValuationError;

/// Coerce a JSON value to f64. The FMP ratio feeds serialize numbers as
/// strings, so numeric strings are accepted too.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// One reporting period of a fetched statement: named line items to values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementPeriod {
    pub fields: serde_json::Map<String, Value>,
}

impl StatementPeriod {
    /// Look up a named line item, if present and numeric.
    pub fn get(&self, item: &str) -> Option<f64> {
        self.fields.get(item).and_then(as_number)
    }

    /// Look up a named line item, erroring if it is missing or non-numeric.
    pub fn value(&self, item: &str) -> Result<f64, ValuationError> {
        self.get(item)
            .ok_or_else(|| ValuationError::DataUnavailable(format!("missing line item '{item}'")))
    }
}

/// An ordered series of statement periods, index 0 = most recent.
///
/// Periods across statement types are not cross-validated for date
/// alignment; callers supply statements of matching periods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement {
    pub periods: Vec<StatementPeriod>,
}

impl Statement {
    pub fn period(&self, index: usize) -> Result<&StatementPeriod, ValuationError> {
        self.periods.get(index).ok_or_else(|| {
            ValuationError::DataUnavailable(format!(
                "statement has {} period(s), period {index} requested",
                self.periods.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// One period of the financial-ratios feed: ratio groups keyed by name
/// (e.g. `profitabilityIndicatorRatios`), each a map of named ratios.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatioPeriod {
    pub groups: serde_json::Map<String, Value>,
}

impl RatioPeriod {
    pub fn ratio(&self, group: &str, item: &str) -> Result<f64, ValuationError> {
        self.groups
            .get(group)
            .and_then(|g| g.get(item))
            .and_then(as_number)
            .ok_or_else(|| {
                ValuationError::DataUnavailable(format!("missing ratio '{group}.{item}'"))
            })
    }
}

/// The `financial-ratios` payload: `{"symbol": ..., "ratios": [...]}` with
/// period 0 most recent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatioHistory {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub ratios: Vec<RatioPeriod>,
}

impl RatioHistory {
    pub fn period(&self, index: usize) -> Result<&RatioPeriod, ValuationError> {
        self.ratios.get(index).ok_or_else(|| {
            ValuationError::DataUnavailable(format!(
                "ratio history has {} period(s), period {index} requested",
                self.ratios.len()
            ))
        })
    }

    pub fn ratio(&self, index: usize, group: &str, item: &str) -> Result<f64, ValuationError> {
        self.period(index)?.ratio(group, item)
    }
}

/// The `enterprise-value` payload: `{"symbol": ..., "enterpriseValues": [...]}`.
/// Its line items carry the provider's display keys verbatim
/// (`"+ Total Debt"`, `"- Cash & Cash Equivalents"`, `"Number of Shares"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnterpriseValues {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, rename = "enterpriseValues")]
    pub periods: Vec<StatementPeriod>,
}

impl EnterpriseValues {
    pub fn period(&self, index: usize) -> Result<&StatementPeriod, ValuationError> {
        self.periods.get(index).ok_or_else(|| {
            ValuationError::DataUnavailable(format!(
                "enterprise-value statement has {} period(s), period {index} requested",
                self.periods.len()
            ))
        })
    }
}

/// The six statement collections a DCF valuation reads.
#[derive(Debug, Clone, Default)]
pub struct StatementSet {
    pub income: Statement,
    pub balance: Statement,
    /// Quarterly balance sheet; capital-structure proportions use its
    /// most recent period rather than the annual one.
    pub balance_quarterly: Statement,
    pub cash_flow: Statement,
    pub enterprise_value: EnterpriseValues,
    pub ratios: RatioHistory,
}

/// Growth-rate assumptions for a valuation run, each a fractional rate
/// (0.1 = 10%).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrowthAssumptions {
    /// Expected earnings growth over the forecast horizon.
    pub earnings: f64,
    /// Expected capital-expenditure growth over the forecast horizon.
    pub capex: f64,
    /// Perpetual growth rate used for the terminal value.
    pub perpetual: f64,
}

/// Completed DCF valuation. Every field is derived in a fixed order by the
/// engine stages; the sensitivity sweep reuses the cached cash-flow list
/// and capital-structure figures without re-fetching anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub ticker: String,
    pub forecast_years: u32,
    pub risk_free_rate: f64,
    pub interest_coverage: f64,
    pub cost_of_debt: f64,
    pub cost_of_equity: f64,
    pub effective_tax_rate: f64,
    pub wacc: f64,
    /// Present-valued free cash flows; index 0 is the undiscounted base
    /// year, indices 1..=N the discounted forecast years.
    pub discounted_fcf: Vec<f64>,
    pub perpetual_growth_rate: f64,
    pub enterprise_value: f64,
    pub total_debt: f64,
    pub cash_and_equivalents: f64,
    pub shares_outstanding: f64,
    pub equity_value: f64,
    pub implied_share_price: f64,
}
