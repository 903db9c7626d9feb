use chrono::NaiveDate;
use httpmock::prelude::*;
use portfolio_report::adapters::yahoo::YahooPriceSource;
use portfolio_report::domain::ports::PriceSource;
use portfolio_report::ReportError;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_fetch_daily_closes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v8/finance/chart/PAYTM.NS")
            .query_param("period1", "1704067200")
            .query_param("period2", "1704326400")
            .query_param("interval", "1d")
            .header_exists("user-agent");
        then.status(200).json_body(serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "currency": "INR", "symbol": "PAYTM.NS" },
                    "timestamp": [1704100500, 1704186900, 1704273300],
                    "indicators": { "quote": [{
                        "open": [640.0, 650.0, 655.0],
                        "close": [645.5, null, 660.25]
                    }] }
                }],
                "error": null
            }
        }));
    });

    let source = YahooPriceSource::new(&server.base_url());
    let points = source
        .fetch_daily_closes("PAYTM.NS", date(2024, 1, 1), date(2024, 1, 3))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].date, date(2024, 1, 1));
    assert_eq!(points[0].close, Some(645.5));
    assert_eq!(points[1].close, None);
    assert_eq!(points[2].close, Some(660.25));
}

#[tokio::test]
async fn test_unknown_symbol_reports_chart_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/NOPE.NS");
        then.status(404).json_body(serde_json::json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" } }
        }));
    });

    let source = YahooPriceSource::new(&server.base_url());
    let err = source
        .fetch_daily_closes("NOPE.NS", date(2024, 1, 1), date(2024, 2, 1))
        .await
        .unwrap_err();

    match err {
        ReportError::PriceDataError { ticker, message } => {
            assert_eq!(ticker, "NOPE.NS");
            assert!(message.contains("delisted"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_result_is_no_points() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/QUIET.NS");
        then.status(200).json_body(serde_json::json!({
            "chart": { "result": [{ "indicators": { "quote": [{}] } }], "error": null }
        }));
    });

    let source = YahooPriceSource::new(&server.base_url());
    let points = source
        .fetch_daily_closes("QUIET.NS", date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap();
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_server_error_is_price_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/BUSY.NS");
        then.status(502).body("<html>Bad Gateway</html>");
    });

    let source = YahooPriceSource::new(&server.base_url());
    let err = source
        .fetch_daily_closes("BUSY.NS", date(2024, 1, 1), date(2024, 1, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::PriceDataError { .. }));
}

#[tokio::test]
async fn test_reserved_characters_do_not_reach_another_symbol() {
    let server = MockServer::start();
    let other = server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/ABC");
        then.status(200).json_body(serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": [1704100500, 1704186900],
                    "indicators": { "quote": [{ "close": [10.0, 20.0] }] }
                }],
                "error": null
            }
        }));
    });

    let source = YahooPriceSource::new(&server.base_url());
    for ticker in ["ABC#2.NS", "ABC?X.NS", "ABC/X.NS"] {
        let result = source
            .fetch_daily_closes(ticker, date(2024, 1, 1), date(2024, 1, 2))
            .await;
        assert!(result.is_err(), "{} resolved to another symbol", ticker);
    }
    other.assert_hits(0);
}
