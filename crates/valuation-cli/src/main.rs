//! Run a full analysis for one ticker and print the report.
//!
//! Usage: `valuation-cli TICKER [HORIZON] [EARNINGS_G] [CAPEX_G] [PERPETUAL_G]`
//! with the FMP credential read from the `FMP_API_KEY` environment variable
//! (a `.env` file is honored).

use dcf_engine::synthetic_rating;
use valuation_core::GrowthAssumptions;
use valuation_orchestrator::{AnalysisReport, ValuationOrchestrator};

const DEFAULT_HORIZON: u32 = 4;
const DEFAULT_CONFIDENCE_LEVELS: &[f64] = &[0.95, 0.9, 0.85, 0.8, 0.75, 0.7];
const DEFAULT_BOUND: f64 = 0.3;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let ticker = args
        .first()
        .ok_or_else(|| anyhow::anyhow!("usage: valuation-cli TICKER [HORIZON] [EARNINGS_G] [CAPEX_G] [PERPETUAL_G]"))?
        .to_uppercase();

    let horizon: u32 = match args.get(1) {
        Some(raw) => raw.parse()?,
        None => DEFAULT_HORIZON,
    };

    let rate_arg = |index: usize, default: f64| -> anyhow::Result<f64> {
        match args.get(index) {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(default),
        }
    };
    let assumptions = GrowthAssumptions {
        earnings: rate_arg(2, 0.15)?,
        capex: rate_arg(3, 0.05)?,
        perpetual: rate_arg(4, 0.02)?,
    };

    let api_key = std::env::var("FMP_API_KEY")
        .map_err(|_| anyhow::anyhow!("FMP_API_KEY environment variable is not set"))?;

    let orchestrator = ValuationOrchestrator::new(api_key);
    let report = orchestrator
        .analyze(
            &ticker,
            horizon,
            assumptions,
            DEFAULT_CONFIDENCE_LEVELS,
            DEFAULT_BOUND,
        )
        .await?;

    print_report(&ticker, &report);
    Ok(())
}

fn print_report(ticker: &str, report: &AnalysisReport) {
    let valuation = &report.valuation;
    println!("DCF valuation for {ticker}");
    println!("  interest coverage:    {:.4}", valuation.interest_coverage);
    println!(
        "  synthetic rating:     {}",
        synthetic_rating(valuation.interest_coverage)
    );
    println!("  risk-free rate:       {:.4}", valuation.risk_free_rate);
    println!("  cost of debt:         {:.4}", valuation.cost_of_debt);
    println!("  cost of equity:       {:.4}", valuation.cost_of_equity);
    println!("  WACC:                 {:.4}", valuation.wacc);
    println!("  enterprise value:     {:.4}", valuation.enterprise_value);
    println!("  equity value:         {:.4}", valuation.equity_value);
    println!("  implied share price:  {:.4}", valuation.implied_share_price);

    let summary = &report.sensitivity.summary;
    println!();
    println!("Implied share price sensitivity");
    println!("  min:    ${:.2}", summary.min);
    println!("  max:    ${:.2}", summary.max);
    println!("  mean:   ${:.2}", summary.mean);
    println!("  median: ${:.2}", summary.median);
    for band in &report.sensitivity.confidence_bands {
        println!(
            "  at confidence {:.2}: ${:.4} : ${:.4}",
            band.level, band.lower, band.upper
        );
    }

    let f_score = &report.f_score;
    println!();
    println!("Piotroski F-Score: {}/9 ({:.4}%)", f_score.total, f_score.total_performance);
    println!(
        "  profitability:        {}/4 ({:.4}%)",
        f_score.profitability, f_score.profitability_performance
    );
    println!(
        "  leverage/liquidity:   {}/3 ({:.4}%)",
        f_score.leverage_liquidity, f_score.leverage_liquidity_performance
    );
    println!(
        "  operating efficiency: {}/2 ({:.4}%)",
        f_score.operating_efficiency, f_score.operating_efficiency_performance
    );
}
