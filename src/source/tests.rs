//! Tests for source adapters

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::source::bitstamp::BitstampSource;
    use crate::source::brti::BrtiSource;
    use crate::source::coinbase::CoinbaseSource;
    use crate::source::{parse_f64, parse_i64, CandleSource, TickerSource};
    use crate::types::Source;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_f64_accepts_padded_decimal() {
        assert_eq!(parse_f64("last", " 43210.55 ").unwrap(), 43210.55);
    }

    #[test]
    fn test_parse_f64_rejects_garbage() {
        let err = parse_f64("last", "abc").unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[test]
    fn test_parse_f64_rejects_non_finite() {
        assert!(matches!(
            parse_f64("last", "NaN"),
            Err(StoreError::Format(_))
        ));
        assert!(matches!(
            parse_f64("last", "inf"),
            Err(StoreError::Format(_))
        ));
    }

    #[test]
    fn test_parse_i64_rejects_decimal() {
        let err = parse_i64("timestamp", "1700000000.5").unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[tokio::test]
    async fn test_brti_fetch_normalizes_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"value":43210.55,"date":"2023-11-14 22:13:20"}"#,
            ))
            .mount(&server)
            .await;

        let source = BrtiSource::with_base_url(&server.uri()).unwrap();
        let tick = source.fetch_ticker().await.unwrap();

        assert_eq!(tick.source, Source::Brti);
        assert_eq!(tick.timestamp, 1_700_000_000);
        assert_eq!(tick.price, 43210.55);
        assert!(tick.low.is_none());
        assert!(tick.high.is_none());
    }

    #[tokio::test]
    async fn test_brti_rejects_malformed_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"value":43210.55,"date":"14/11/2023 22:13"}"#,
            ))
            .mount(&server)
            .await;

        let source = BrtiSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch_ticker().await.unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[tokio::test]
    async fn test_brti_maps_server_error_to_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = BrtiSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch_ticker().await.unwrap_err();
        assert!(matches!(err, StoreError::Network(_)));
    }

    #[tokio::test]
    async fn test_bitstamp_fetch_normalizes_hour_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/ticker_hour/btcusd/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"timestamp": "1700000000", "open": "43000.00", "high": "43500.00", "low": "42800.00", "last": "43210.55", "volume": "1234.56"}"#,
            ))
            .mount(&server)
            .await;

        let source = BitstampSource::with_base_url(&server.uri()).unwrap();
        let tick = source.fetch_ticker().await.unwrap();

        assert_eq!(tick.source, Source::Bitstamp);
        assert_eq!(tick.timestamp, 1_700_000_000);
        assert_eq!(tick.price, 43210.55);
        assert_eq!(tick.low, Some(42800.0));
        assert_eq!(tick.high, Some(43500.0));
    }

    #[tokio::test]
    async fn test_bitstamp_rejects_bad_decimal_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"timestamp": "1700000000", "high": "43500.00", "low": "42800.00", "last": "not-a-price"}"#,
            ))
            .mount(&server)
            .await;

        let source = BitstampSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch_ticker().await.unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[tokio::test]
    async fn test_bitstamp_maps_html_body_to_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"),
            )
            .mount(&server)
            .await;

        let source = BitstampSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch_ticker().await.unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[tokio::test]
    async fn test_coinbase_ticker_parses_rfc3339_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/BTC-USD/ticker"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"trade_id": 123456, "price": "43210.55", "size": "0.01", "time": "2023-11-14T22:13:20.123456Z", "bid": "43210.00", "ask": "43211.00", "volume": "9999.0"}"#,
            ))
            .mount(&server)
            .await;

        let source = CoinbaseSource::with_base_url(&server.uri()).unwrap();
        let tick = source.fetch_ticker().await.unwrap();

        assert_eq!(tick.source, Source::Coinbase);
        assert_eq!(tick.timestamp, 1_700_000_000);
        assert_eq!(tick.price, 43210.55);
        assert!(tick.low.is_none());
    }

    #[tokio::test]
    async fn test_coinbase_candles_preserve_upstream_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/BTC-USD/candles"))
            .and(query_param("start", "2023-11-14T22:11:20Z"))
            .and(query_param("end", "2023-11-14T22:13:20Z"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[[1700000040,42999.9,43100.0,43050.0,43080.1,12.3],[1699999980,42990.5,43080.0,43000.0,43050.0,10.0]]"#,
            ))
            .mount(&server)
            .await;

        let source = CoinbaseSource::with_base_url(&server.uri()).unwrap();
        let candles = source
            .fetch_candles(1_700_000_000 - 120, 1_700_000_000)
            .await
            .unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_000_040);
        assert_eq!(candles[0].low, 42999.9);
        assert_eq!(candles[0].high, 43100.0);
        assert_eq!(candles[0].open, 43050.0);
        assert_eq!(candles[0].close, 43080.1);
        assert_eq!(candles[1].timestamp, 1_699_999_980);
    }

    #[tokio::test]
    async fn test_coinbase_candles_reject_short_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[[1700000040,42999.9]]"#),
            )
            .mount(&server)
            .await;

        let source = CoinbaseSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch_candles(0, 120).await.unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[tokio::test]
    async fn test_coinbase_candles_empty_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let source = CoinbaseSource::with_base_url(&server.uri()).unwrap();
        let candles = source.fetch_candles(0, 120).await.unwrap();
        assert!(candles.is_empty());
    }
}
