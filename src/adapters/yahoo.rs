//! Daily closes from the Yahoo Finance chart API.

use crate::domain::model::PricePoint;
use crate::domain::ports::PriceSource;
use crate::utils::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PRICE_ENDPOINT: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; portfolio-report)";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooPriceSource {
    client: Client,
    endpoint: String,
}

impl YahooPriceSource {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn range(from: NaiveDate, to: NaiveDate) -> (i64, i64) {
        // period2 不含當天，往後推一天讓 to 也被包含
        let start = from
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let end = to
            .succ_opt()
            .unwrap_or(to)
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        (start, end)
    }

    fn to_points(ticker: &str, chart: Chart) -> Result<Vec<PricePoint>> {
        if let Some(error) = chart.error {
            return Err(ReportError::PriceDataError {
                ticker: ticker.to_string(),
                message: format!(
                    "{}: {}",
                    error.code.unwrap_or_default(),
                    error.description.unwrap_or_default()
                ),
            });
        }

        let Some(result) = chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let points = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
                Some(PricePoint {
                    date,
                    close: closes.get(i).copied().flatten(),
                })
            })
            .collect();
        Ok(points)
    }
}

impl YahooPriceSource {
    /// 代號整段編碼為單一路徑片段，`#`、`?`、`/` 不會改變查詢對象
    fn chart_url(&self, ticker: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| ReportError::ConfigError {
            message: format!("Invalid price endpoint '{}': {}", self.endpoint, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| ReportError::ConfigError {
                message: format!("Price endpoint '{}' cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        Ok(url)
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let (period1, period2) = Self::range(from, to);
        let url = self.chart_url(ticker)?;

        tracing::debug!("Fetching daily closes: {} {}..{}", ticker, from, to);
        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Yahoo 在 404 時仍回傳 chart.error，優先採用它的說明
        match serde_json::from_str::<ChartResponse>(&text) {
            Ok(parsed) if status.is_success() || parsed.chart.error.is_some() => {
                let points = Self::to_points(ticker, parsed.chart)?;
                tracing::debug!("Received {} price points for {}", points.len(), ticker);
                Ok(points)
            }
            Ok(_) => Err(ReportError::PriceDataError {
                ticker: ticker.to_string(),
                message: format!("HTTP {}", status),
            }),
            Err(e) => Err(ReportError::PriceDataError {
                ticker: ticker.to_string(),
                message: format!("HTTP {}: unreadable response ({})", status, e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_url_encodes_ticker_as_one_segment() {
        let source = YahooPriceSource::new("http://localhost:8080/");
        let cases = [
            ("PAYTM.NS", "/v8/finance/chart/PAYTM.NS"),
            ("ABC#2.NS", "/v8/finance/chart/ABC%232.NS"),
            ("ABC?X.NS", "/v8/finance/chart/ABC%3FX.NS"),
            ("ABC/X.NS", "/v8/finance/chart/ABC%2FX.NS"),
        ];
        for (ticker, path) in cases {
            let url = source.chart_url(ticker).unwrap();
            assert_eq!(url.path(), path);
            assert!(url.query().is_none());
            assert!(url.fragment().is_none());
        }
    }

    #[test]
    fn test_chart_url_rejects_bad_endpoint() {
        let source = YahooPriceSource::new("not a url");
        assert!(matches!(
            source.chart_url("X.NS"),
            Err(ReportError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_range_includes_end_date() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(YahooPriceSource::range(from, to), (1_704_067_200, 1_704_240_000));
    }

    #[test]
    fn test_null_closes_are_kept() {
        let chart: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":[{"timestamp":[1704067200,1704153600],
                "indicators":{"quote":[{"close":[null,101.5]}]}}],"error":null}}"#,
        )
        .unwrap();
        let points = YahooPriceSource::to_points("X.NS", chart.chart).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, None);
        assert_eq!(points[1].close, Some(101.5));
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_chart_error_is_reported() {
        let chart: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap();
        let err = YahooPriceSource::to_points("GONE.NS", chart.chart).unwrap_err();
        assert!(err.to_string().contains("GONE.NS"));
    }
}
