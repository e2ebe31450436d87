//! Integration tests for the eastmoney HK adapter against a local HTTP server.

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use surge_screener::data::{
    EastmoneyHkAdapter, HistorySource, ProviderError, SnapshotSource,
};
use surge_screener::screener::{Candidate, GrowthAnalyzer, ScreenerConfig, SnapshotFilter};

const CLIST_PATH: &str = "/api/qt/clist/get";
const KLINE_PATH: &str = "/api/qt/stock/kline/get";

fn adapter(server: &MockServer) -> EastmoneyHkAdapter {
    EastmoneyHkAdapter::with_base_urls(
        format!("{}{}", server.uri(), CLIST_PATH),
        format!("{}{}", server.uri(), KLINE_PATH),
    )
}

#[tokio::test]
async fn test_snapshot_pages_until_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CLIST_PATH))
        .and(query_param("pn", "1"))
        .and(query_param("fs", "m:128 t:3,m:128 t:4,m:128 t:1,m:128 t:2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "total": 3,
                "diff": [
                    {"f12": "00700", "f14": "腾讯控股", "f2": 380.2, "f3": 1.2, "f5": 21000000, "f6": 8.1e9},
                    {"f12": "00005", "f14": "汇丰控股", "f2": 65.1, "f3": -0.3, "f5": 15000000, "f6": 9.7e8}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(CLIST_PATH))
        .and(query_param("pn", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "total": 3,
                "diff": [
                    {"f12": "08001", "f14": "停牌股", "f2": "-", "f3": "-", "f5": "-", "f6": "-"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = adapter(&server).get_market_snapshot().await.unwrap();

    assert_eq!(
        snapshot.headers,
        vec!["代码", "名称", "最新价", "涨跌幅", "成交量", "成交额"]
    );
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.rows[2][5], json!("-"));
}

#[tokio::test]
async fn test_snapshot_stops_on_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CLIST_PATH))
        .and(query_param("pn", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {"diff": [{"f12": "00700", "f14": "腾讯控股", "f6": 8.1e9}]}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(CLIST_PATH))
        .and(query_param("pn", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rc": 0, "data": null})))
        .mount(&server)
        .await;

    let snapshot = adapter(&server).get_market_snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test]
async fn test_snapshot_feeds_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CLIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "total": 2,
                "diff": [
                    {"f12": "00700", "f14": "腾讯控股", "f6": 8.1e9},
                    {"f12": "08001", "f14": "细价股", "f6": 1.2e6}
                ]
            }
        })))
        .mount(&server)
        .await;

    let filter = SnapshotFilter::new(Arc::new(adapter(&server)));
    let candidates = filter.fetch_candidates(30_000_000.0).await;

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].symbol, "00700");
    assert_eq!(candidates[0].name, "腾讯控股");
}

#[tokio::test]
async fn test_kline_history() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("secid", "116.00700"))
        .and(query_param("klt", "101"))
        .and(query_param("fqt", "0"))
        .and(query_param("lmt", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "code": "00700",
                "klines": [
                    "2024-06-03,370.0,372.4,375.0,368.2,15000000,5586000000.0",
                    "2024-06-04,372.4,380.0,381.0,371.0,21000000,7980000000.0"
                ]
            }
        })))
        .mount(&server)
        .await;

    let records = adapter(&server)
        .get_daily_history("00700", Some(10))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].close, 380.0);
    assert_eq!(records[1].volume, 21_000_000.0);
    assert_eq!(records[1].session_turnover(), 7_980_000_000.0);
}

#[tokio::test]
async fn test_kline_error_code_is_internal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rc": 102, "data": null})))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .get_daily_history("00700", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Internal(_)));
}

#[tokio::test]
async fn test_http_error_is_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    let err = adapter.get_daily_history("00700", None).await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
    assert!(err.is_recoverable());

    let err = adapter.get_market_snapshot().await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
}

#[tokio::test]
async fn test_suspended_row_does_not_drop_candidate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .and(query_param("secid", "116.00700"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "code": "00700",
                "klines": [
                    "2024-05-20,1,-,1,1,-,0",
                    "2024-06-03,10,10,10,10,1000,10000",
                    "2024-06-04,10,10,10,10,4000,40000"
                ]
            }
        })))
        .mount(&server)
        .await;

    let mut config = ScreenerConfig::default();
    config.pacing_ms = 0;
    let analyzer = GrowthAnalyzer::new(Arc::new(adapter(&server)), &config)
        .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());

    let candidates = vec![Candidate {
        symbol: "00700".into(),
        name: "腾讯控股".into(),
        turnover: 8.1e9,
    }];
    let tiers = analyzer.analyze(&candidates).await;

    assert_eq!(tiers.stats.failed, 0);
    assert_eq!(tiers.stats.analyzed, 1);
    for tier in [&tiers.grow50, &tiers.grow100, &tiers.grow200] {
        assert_eq!(tier.len(), 1);
        assert_eq!(tier[0].growth_ratio, 4.0);
    }
}

#[tokio::test]
async fn test_rate_limit_maps_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    let err = adapter.get_daily_history("00700", None).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_secs: Some(30)
        }
    ));
    assert!(err.is_recoverable());

    let err = adapter.get_market_snapshot().await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { .. }));
}

#[tokio::test]
async fn test_missing_kline_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KLINE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rc": 0, "data": null})))
        .mount(&server)
        .await;

    let adapter = adapter(&server);
    let err = adapter.get_daily_history("09999", None).await.unwrap_err();
    assert!(matches!(err, ProviderError::DataNotAvailable(_)));
    assert!(adapter.health_check().await.is_err());
}

#[tokio::test]
async fn test_invalid_symbol_rejected() {
    let server = MockServer::start().await;
    let err = adapter(&server)
        .get_daily_history("AAPL", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}
