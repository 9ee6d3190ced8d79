//! Yahoo Finance data provider.
//!
//! Price history comes from the v8 chart API; fundamentals from the v10
//! quoteSummary API. Both share one HTTP client, one retry policy with
//! exponential backoff, and one circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; parse failures surface as `DataError::ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{
    clean_bars, DataError, DataProvider, DataSource, FetchResult, FundamentalsProvider,
};
use crate::domain::{Bar, EarningsPoint, EarningsSeries, FundamentalSnapshot};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

// ── chart API ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

// ── quoteSummary API ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryModules {
    earnings: Option<EarningsModule>,
    default_key_statistics: Option<KeyStatistics>,
    major_holders_breakdown: Option<HoldersBreakdown>,
}

/// Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`, or `{}` when absent.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EarningsModule {
    earnings_chart: EarningsChart,
    financials_chart: FinancialsChart,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EarningsChart {
    quarterly: Vec<EpsQuarter>,
}

#[derive(Debug, Deserialize)]
struct EpsQuarter {
    date: String,
    #[serde(default)]
    actual: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinancialsChart {
    yearly: Vec<FinancialsPeriod>,
    quarterly: Vec<FinancialsPeriod>,
}

#[derive(Debug, Deserialize)]
struct FinancialsPeriod {
    date: serde_json::Value,
    #[serde(default)]
    earnings: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatistics {
    shares_outstanding: RawValue,
    held_percent_institutions: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HoldersBreakdown {
    institutions_percent_held: RawValue,
}

/// Yahoo Finance provider for both price history and fundamentals.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{BASE_URL}/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    fn summary_url(symbol: &str) -> String {
        format!(
            "{BASE_URL}/v10/finance/quoteSummary/{symbol}\
             ?modules=earnings,defaultKeyStatistics,majorHoldersBreakdown"
        )
    }

    /// Parse the chart API response into bars.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp
            .chart
            .result
            .ok_or_else(|| api_error(symbol, resp.chart.error))?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A listed symbol with no sessions in range has no timestamps at all.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
            // Holidays and halted sessions come back with a null close.
            let Some(close) = at(&quote.close) else {
                continue;
            };

            bars.push(Bar {
                date,
                open: at(&quote.open).unwrap_or(close),
                high: at(&quote.high).unwrap_or(close),
                low: at(&quote.low).unwrap_or(close),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }

        Ok(clean_bars(bars))
    }

    /// Parse the quoteSummary response into a snapshot.
    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<FundamentalSnapshot, DataError> {
        let modules = resp
            .quote_summary
            .result
            .ok_or_else(|| api_error(symbol, resp.quote_summary.error))?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let missing = |reason: &str| DataError::MissingFundamentals {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        let earnings = modules
            .earnings
            .ok_or_else(|| missing("no earnings module"))?;

        // Prefer reported EPS; fall back to quarterly net earnings.
        let mut quarterly: Vec<EarningsPoint> = earnings
            .earnings_chart
            .quarterly
            .iter()
            .filter_map(|q| {
                q.actual.raw.map(|value| EarningsPoint {
                    period: q.date.clone(),
                    value,
                })
            })
            .collect();
        if quarterly.is_empty() {
            quarterly = financial_points(&earnings.financials_chart.quarterly);
        }
        let annual = financial_points(&earnings.financials_chart.yearly);

        let stats = modules.default_key_statistics.unwrap_or_default();
        let shares = stats
            .shares_outstanding
            .raw
            .filter(|s| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| missing("no shares outstanding"))?;

        // Reported as a fraction; missing ownership screens as 0%.
        let institutional = stats
            .held_percent_institutions
            .raw
            .or_else(|| {
                modules
                    .major_holders_breakdown
                    .and_then(|h| h.institutions_percent_held.raw)
            })
            .unwrap_or(0.0);

        Ok(FundamentalSnapshot {
            quarterly_earnings: EarningsSeries::new(quarterly),
            annual_earnings: EarningsSeries::new(annual),
            shares_outstanding: shares.round() as u64,
            institutional_ownership_pct: (institutional * 100.0).clamp(0.0, 100.0),
        })
    }

    /// GET a JSON document with retry, backoff and circuit breaker logic.
    fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let parsed: T = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Ok(parsed);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

fn api_error(symbol: &str, error: Option<ApiError>) -> DataError {
    match error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    }
}

fn financial_points(periods: &[FinancialsPeriod]) -> Vec<EarningsPoint> {
    periods
        .iter()
        .filter_map(|p| {
            let period = match &p.date {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            p.earnings.raw.map(|value| EarningsPoint { period, value })
        })
        .collect()
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let resp: ChartResponse = self.get_json(symbol, &Self::chart_url(symbol, start, end))?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: Self::parse_chart(symbol, resp)?,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

impl FundamentalsProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, DataError> {
        let resp: SummaryResponse = self.get_json(symbol, &Self::summary_url(symbol))?;
        Self::parse_summary(symbol, resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, null, 102.0],
                        "high":   [101.0, null, 103.5],
                        "low":    [99.0,  null, 101.0],
                        "close":  [100.5, null, 103.0],
                        "volume": [1000,  null, 1200]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    const SUMMARY_JSON: &str = r#"{
        "quoteSummary": {
            "result": [{
                "earnings": {
                    "earningsChart": {
                        "quarterly": [
                            {"date": "1Q2024", "actual": {"raw": 1.0, "fmt": "1.00"}},
                            {"date": "2Q2024", "actual": {"raw": 1.3, "fmt": "1.30"}},
                            {"date": "3Q2024", "actual": {}}
                        ]
                    },
                    "financialsChart": {
                        "yearly": [
                            {"date": 2021, "earnings": {"raw": 100.0}},
                            {"date": 2022, "earnings": {"raw": 130.0}},
                            {"date": 2023, "earnings": {"raw": 170.0}}
                        ],
                        "quarterly": []
                    }
                },
                "defaultKeyStatistics": {
                    "sharesOutstanding": {"raw": 50000000, "fmt": "50M"},
                    "heldPercentInstitutions": {"raw": 0.35, "fmt": "35%"}
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_chart_and_skips_null_sessions() {
        let resp: ChartResponse = serde_json::from_str(CHART_JSON).unwrap();
        let bars = YahooProvider::parse_chart("ACME", resp).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[1].volume, 1200);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn chart_not_found_maps_to_symbol_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooProvider::parse_chart("NOPE", resp).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { ref symbol } if symbol == "NOPE"));
    }

    #[test]
    fn parses_summary_into_snapshot() {
        let resp: SummaryResponse = serde_json::from_str(SUMMARY_JSON).unwrap();
        let snap = YahooProvider::parse_summary("ACME", resp).unwrap();
        assert_eq!(snap.quarterly_earnings.len(), 2);
        assert_eq!(snap.quarterly_earnings.points()[1].period, "2Q2024");
        assert_eq!(snap.annual_earnings.len(), 3);
        assert_eq!(snap.annual_earnings.points()[0].period, "2021");
        assert_eq!(snap.shares_outstanding, 50_000_000);
        assert!((snap.institutional_ownership_pct - 35.0).abs() < 1e-9);
    }

    #[test]
    fn summary_without_shares_is_missing_data() {
        let json = r#"{"quoteSummary":{"result":[{"earnings":{},"defaultKeyStatistics":{}}],"error":null}}"#;
        let resp: SummaryResponse = serde_json::from_str(json).unwrap();
        let err = YahooProvider::parse_summary("ACME", resp).unwrap_err();
        assert!(matches!(err, DataError::MissingFundamentals { .. }));
    }

    #[test]
    fn ownership_falls_back_to_holders_breakdown() {
        let json = r#"{"quoteSummary":{"result":[{
            "earnings":{},
            "defaultKeyStatistics":{"sharesOutstanding":{"raw":1000}},
            "majorHoldersBreakdown":{"institutionsPercentHeld":{"raw":0.42}}
        }],"error":null}}"#;
        let resp: SummaryResponse = serde_json::from_str(json).unwrap();
        let snap = YahooProvider::parse_summary("ACME", resp).unwrap();
        assert!((snap.institutional_ownership_pct - 42.0).abs() < 1e-9);
        assert!(snap.quarterly_earnings.is_empty());
    }

    #[test]
    fn chart_url_covers_end_date() {
        let url = YahooProvider::chart_url(
            "SPY",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1704153600"));
    }
}
