//! Historical annualized returns (CAGR) for holdings and a benchmark.

use crate::domain::model::{Cagr, Holding, PricePoint, ReturnRecord, NOT_AVAILABLE};
use crate::domain::ports::PriceSource;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

/// NIFTY 50 index.
pub const DEFAULT_BENCHMARK_TICKER: &str = "^NSEI";

const DAYS_PER_YEAR: f64 = 365.25;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_invested_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Years between midnight UTC of `from` and `now`.
pub fn elapsed_years(from: NaiveDate, now: DateTime<Utc>) -> Option<f64> {
    let start = from.and_hms_opt(0, 0, 0)?.and_utc();
    let millis = (now - start).num_milliseconds() as f64;
    Some(millis / (DAYS_PER_YEAR * MILLIS_PER_DAY))
}

/// `(end / start)^(1 / years) - 1`, or `None` when undefined.
pub fn cagr(start: f64, end: f64, years: f64) -> Option<f64> {
    if !(start.is_finite() && end.is_finite() && years.is_finite()) {
        return None;
    }
    if start <= 0.0 || end <= 0.0 || years <= 0.0 {
        return None;
    }
    let rate = (end / start).powf(1.0 / years) - 1.0;
    rate.is_finite().then_some(rate)
}

/// CAGR between the earliest and latest close of `points`.
pub fn cagr_from_series(mut points: Vec<PricePoint>, years: f64) -> Cagr {
    if points.len() < 2 {
        return Cagr::NotAvailable;
    }
    points.sort_by(|a, b| a.date.cmp(&b.date));

    let first = points.first().and_then(|p| p.close);
    let last = points.last().and_then(|p| p.close);
    match (first, last) {
        (Some(start), Some(end)) => cagr(start, end, years)
            .map(Cagr::Rate)
            .unwrap_or(Cagr::NotAvailable),
        _ => Cagr::NotAvailable,
    }
}

pub struct ReturnAnalyzer<P: PriceSource> {
    source: P,
    benchmark: String,
    max_concurrency: usize,
}

impl<P: PriceSource> ReturnAnalyzer<P> {
    pub fn new(source: P, benchmark: impl Into<String>, max_concurrency: usize) -> Self {
        Self {
            source,
            benchmark: benchmark.into(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn compute_return(&self, ticker: &str, invested_date: Option<NaiveDate>) -> Cagr {
        self.compute_return_as_of(ticker, invested_date, Utc::now())
            .await
    }

    /// CAGR of `ticker` from `invested_date` to `now`. Never fails.
    pub async fn compute_return_as_of(
        &self,
        ticker: &str,
        invested_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Cagr {
        let ticker = ticker.trim();
        let Some(from) = invested_date else {
            return Cagr::NotAvailable;
        };
        if ticker.is_empty() || ticker == NOT_AVAILABLE {
            return Cagr::NotAvailable;
        }

        let years = match elapsed_years(from, now) {
            Some(years) if years > 0.0 => years,
            _ => {
                tracing::debug!("No elapsed time for {} since {}", ticker, from);
                return Cagr::NotAvailable;
            }
        };

        let to = now.date_naive();
        let points = match self.source.fetch_daily_closes(ticker, from, to).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("❌ Error fetching prices for {}: {}", ticker, e);
                return Cagr::NotAvailable;
            }
        };

        if points.len() < 2 {
            tracing::warn!("⚠️ No data for {} between {} and {}", ticker, from, to);
            return Cagr::NotAvailable;
        }

        cagr_from_series(points, years)
    }

    async fn analyze_holding(
        &self,
        holding: &Holding,
        ticker: &str,
        now: DateTime<Utc>,
    ) -> ReturnRecord {
        let (asset_cagr, benchmark_cagr) = match holding.invested_date {
            Some(date) => {
                futures::join!(
                    self.compute_return_as_of(ticker, Some(date), now),
                    self.compute_return_as_of(&self.benchmark, Some(date), now)
                )
            }
            None => (Cagr::NotAvailable, Cagr::NotAvailable),
        };

        ReturnRecord {
            asset_name: holding.name.clone(),
            ticker: ticker.to_string(),
            invested_date: holding.invested_date,
            asset_cagr,
            benchmark_cagr,
        }
    }

    pub async fn analyze(
        &self,
        holdings: &[Holding],
        tickers: &HashMap<String, String>,
    ) -> Vec<ReturnRecord> {
        self.analyze_as_of(holdings, tickers, Utc::now()).await
    }

    /// One record per holding, in input order, at most `max_concurrency`
    /// holdings in flight.
    pub async fn analyze_as_of(
        &self,
        holdings: &[Holding],
        tickers: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Vec<ReturnRecord> {
        tracing::info!(
            "📈 Computing returns for {} holdings against {}",
            holdings.len(),
            self.benchmark
        );

        // 先建立所有 future，再交給 buffered 控制並行數
        let pending: Vec<_> = holdings
            .iter()
            .map(|holding| {
                let ticker = tickers
                    .get(&holding.name)
                    .map(String::as_str)
                    .unwrap_or(NOT_AVAILABLE);
                self.analyze_holding(holding, ticker, now)
            })
            .collect();

        stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{ReportError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPrices {
        series: HashMap<String, Vec<f64>>,
        calls: AtomicUsize,
    }

    impl FixedPrices {
        fn new(series: &[(&str, &[f64])]) -> Self {
            Self {
                series: series
                    .iter()
                    .map(|(t, s)| (t.to_string(), s.to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceSource for FixedPrices {
        async fn fetch_daily_closes(
            &self,
            ticker: &str,
            from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<PricePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let closes = self.series.get(ticker).ok_or_else(|| ReportError::PriceDataError {
                ticker: ticker.to_string(),
                message: "unknown ticker".to_string(),
            })?;
            // 倒序回傳，確認有先排序
            Ok(closes
                .iter()
                .enumerate()
                .rev()
                .map(|(i, close)| PricePoint {
                    date: from + chrono::Duration::days(i as i64),
                    close: Some(*close),
                })
                .collect())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn one_year_after(d: NaiveDate) -> DateTime<Utc> {
        d.and_hms_opt(0, 0, 0).unwrap().and_utc()
            + chrono::Duration::milliseconds(31_557_600_000)
    }

    #[test]
    fn test_parse_invested_date() {
        assert_eq!(parse_invested_date("2023-04-01"), Some(date(2023, 4, 1)));
        assert_eq!(
            parse_invested_date("2023-04-01T10:30:00Z"),
            Some(date(2023, 4, 1))
        );
        assert_eq!(parse_invested_date(""), None);
        assert_eq!(parse_invested_date("01/04/2023"), None);
        assert_eq!(parse_invested_date("2023-02-30"), None);
    }

    #[test]
    fn test_cagr_math() {
        assert!((cagr(100.0, 200.0, 1.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((cagr(100.0, 400.0, 2.0).unwrap() - 1.0).abs() < 1e-12);
        assert!(cagr(0.0, 200.0, 1.0).is_none());
        assert!(cagr(100.0, 200.0, 0.0).is_none());
        assert!(cagr(100.0, f64::NAN, 1.0).is_none());
    }

    #[test]
    fn test_cagr_from_series_requires_endpoints() {
        let d = date(2024, 1, 1);
        let points = vec![
            PricePoint { date: d, close: None },
            PricePoint {
                date: d + chrono::Duration::days(1),
                close: Some(10.0),
            },
        ];
        assert_eq!(cagr_from_series(points, 1.0), Cagr::NotAvailable);
        assert_eq!(cagr_from_series(vec![], 1.0), Cagr::NotAvailable);
    }

    #[tokio::test]
    async fn test_doubling_over_one_year_is_100_percent() {
        let source = FixedPrices::new(&[("X.NS", &[100.0, 200.0])]);
        let analyzer = ReturnAnalyzer::new(source, "^NSEI", 2);
        let from = date(2023, 1, 1);
        let result = analyzer
            .compute_return_as_of("X.NS", Some(from), one_year_after(from))
            .await;
        assert_eq!(result.to_string(), "100.00%");
    }

    #[tokio::test]
    async fn test_single_point_is_not_available() {
        let source = FixedPrices::new(&[("X.NS", &[100.0])]);
        let analyzer = ReturnAnalyzer::new(source, "^NSEI", 2);
        let from = date(2023, 1, 1);
        let result = analyzer
            .compute_return_as_of("X.NS", Some(from), one_year_after(from))
            .await;
        assert_eq!(result, Cagr::NotAvailable);
    }

    #[tokio::test]
    async fn test_short_circuits_skip_the_price_source() {
        let source = FixedPrices::new(&[("X.NS", &[100.0, 200.0])]);
        let analyzer = ReturnAnalyzer::new(source, "^NSEI", 2);
        let today = date(2024, 6, 1);
        let now = today.and_hms_opt(0, 0, 0).unwrap().and_utc();

        let cases = [
            ("X.NS", None),
            ("N/A", Some(today)),
            ("  ", Some(today)),
            // 買入日等於今天：經過時間為零
            ("X.NS", Some(today)),
        ];
        for (ticker, invested) in cases {
            let result = analyzer.compute_return_as_of(ticker, invested, now).await;
            assert_eq!(result, Cagr::NotAvailable, "{:?} {:?}", ticker, invested);
        }
        assert_eq!(analyzer.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_analyze_keeps_order_and_isolates_failures() {
        let source = FixedPrices::new(&[
            ("A.NS", &[100.0, 200.0]),
            ("B.NS", &[100.0, 50.0]),
            ("D.NS", &[100.0, 100.0]),
            ("E.NS", &[100.0, 150.0]),
            ("^NSEI", &[100.0, 110.0]),
        ]);
        let analyzer = ReturnAnalyzer::new(source, "^NSEI", 2);
        let from = date(2023, 1, 1);
        let holdings: Vec<Holding> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| Holding::new(*n, Some(from)))
            .collect();
        let tickers: HashMap<String, String> = holdings
            .iter()
            .map(|h| (h.name.clone(), format!("{}.NS", h.name)))
            .collect();

        let records = analyzer
            .analyze_as_of(&holdings, &tickers, one_year_after(from))
            .await;

        let names: Vec<&str> = records.iter().map(|r| r.asset_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(records[0].asset_cagr.to_string(), "100.00%");
        assert_eq!(records[1].asset_cagr.to_string(), "-50.00%");
        assert_eq!(records[2].asset_cagr, Cagr::NotAvailable);
        assert_eq!(records[3].asset_cagr.to_string(), "0.00%");
        assert_eq!(records[4].asset_cagr.to_string(), "50.00%");
        assert!(records.iter().all(|r| r.benchmark_cagr.to_string() == "10.00%"));
    }

    #[tokio::test]
    async fn test_holding_without_date_or_ticker() {
        let source = FixedPrices::new(&[("^NSEI", &[1.0, 2.0])]);
        let analyzer = ReturnAnalyzer::new(source, "^NSEI", 1);
        let holdings = vec![
            Holding::new("NODATE", None),
            Holding::new("NOTICKER", Some(date(2020, 1, 1))),
        ];

        let records = analyzer
            .analyze_as_of(&holdings, &HashMap::new(), one_year_after(date(2020, 1, 1)))
            .await;

        assert_eq!(records[0].benchmark_cagr, Cagr::NotAvailable);
        assert_eq!(records[1].ticker, "N/A");
        assert_eq!(records[1].asset_cagr, Cagr::NotAvailable);
        assert_eq!(records[1].benchmark_cagr.to_string(), "100.00%");
    }

    struct SlowPrices {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for SlowPrices {
        async fn fetch_daily_closes(
            &self,
            _ticker: &str,
            from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<PricePoint>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![
                PricePoint { date: from, close: Some(10.0) },
                PricePoint { date: from + chrono::Duration::days(1), close: Some(20.0) },
            ])
        }
    }

    fn assert_send<T: Send>(value: T) -> T {
        value
    }

    #[tokio::test]
    async fn test_analyze_future_is_send_and_capped() {
        let source = SlowPrices {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let analyzer = ReturnAnalyzer::new(source, "^NSEI", 2);
        let from = date(2023, 1, 1);
        let holdings: Vec<Holding> = (0..6)
            .map(|i| Holding::new(format!("H{}", i), Some(from)))
            .collect();
        let tickers: HashMap<String, String> = holdings
            .iter()
            .map(|h| (h.name.clone(), format!("{}.NS", h.name)))
            .collect();

        // 需可在 async_trait 的 Send future 中使用
        let records = assert_send(analyzer.analyze_as_of(&holdings, &tickers, one_year_after(from)))
            .await;

        assert_eq!(records.len(), 6);
        assert_eq!(records[5].asset_name, "H5");
        // 每個持股同時抓取資產與基準
        let peak = analyzer.source.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in-flight {}", peak);
        assert!(peak >= 2);
    }
}
