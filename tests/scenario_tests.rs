mod support;

use chrono::Duration;

use cim_combinator::market::PriceRecord;
use cim_combinator::{
    transform_fn, ErrorCategory, ErrorCode, LawConfig, LawKind, StructuredError,
    ViolationSeverity,
};

use support::{btc_ticker, combinator, fixed_now, EchoWrite, Recorder, StubRead};

#[tokio::test]
async fn scenario_a_valid_ticker_is_written() {
    let recorder = Recorder::default();
    let ticker = btc_ticker(fixed_now());
    let read = StubRead::ok("current_price", ticker.clone()).recorded(&recorder);
    let write = EchoWrite::<PriceRecord>::new("store_price").recorded(&recorder);
    let received = write.received();

    let combinator = combinator(LawConfig::default());
    let combination = combinator.bind(read, write).unwrap();
    let outcome = combinator
        .execute(&combination, (), ())
        .run()
        .await
        .expect("valid ticker is written");

    assert_eq!(outcome.value(), &ticker);
    assert!(!outcome.has_warnings());
    assert_eq!(recorder.calls("current_price"), 1);
    assert_eq!(recorder.calls("store_price"), 1);
    assert_eq!(received.lock().unwrap().as_slice(), &[ticker]);
}

#[tokio::test]
async fn scenario_b_negative_price_never_reaches_the_write() {
    let recorder = Recorder::default();
    let mut ticker = btc_ticker(fixed_now());
    ticker.price = -1.0;
    let read = StubRead::ok("current_price", ticker).recorded(&recorder);
    let write = EchoWrite::<PriceRecord>::new("store_price").recorded(&recorder);

    let combinator = combinator(LawConfig::default());
    let combination = combinator.bind(read, write).unwrap();
    let err = combination.execute((), ()).run().await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::Validation);
    assert_eq!(err.code, ErrorCode::MarketDataInvalid);
    assert_eq!(err.message, "Price must be positive");
    assert_eq!(recorder.calls("store_price"), 0);
}

#[tokio::test]
async fn scenario_c_read_failure_is_returned_unchanged() {
    let recorder = Recorder::default();
    let timeout = StructuredError::system("TIMEOUT", "timeout");
    let read = StubRead::<PriceRecord>::err("current_price", timeout.clone()).recorded(&recorder);
    let write = EchoWrite::<PriceRecord>::new("store_price").recorded(&recorder);

    let combinator = combinator(LawConfig::default());
    let combination = combinator.bind(read, write).unwrap();
    let err = combination.execute((), ()).run().await.unwrap_err();

    assert_eq!(err, timeout);
    assert_eq!(recorder.calls("store_price"), 0);
}

#[tokio::test]
async fn scenario_d_failing_transform_stops_the_pipeline() {
    let recorder = Recorder::default();
    let read = StubRead::ok("current_price", btc_ticker(fixed_now())).recorded(&recorder);
    let explode = transform_fn("explode", |_: &PriceRecord| Err::<PriceRecord, _>("boom"));
    let write = EchoWrite::<PriceRecord>::new("store_price").recorded(&recorder);

    let combinator = combinator(LawConfig::default());
    let combination = combinator.bind_with(read, explode, write).unwrap();
    let err = combination.execute((), ()).run().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::TransformationFailed);
    assert_eq!(err.category, ErrorCategory::Transformation);
    assert!(err.is_business());
    assert_eq!(err.message, "boom");
    assert_eq!(err.detail("transform"), Some(&serde_json::json!("explode")));
    assert_eq!(recorder.calls("current_price"), 1);
    assert_eq!(recorder.calls("store_price"), 0);
}

#[tokio::test]
async fn scenario_e_stale_current_price_fails_in_strict_mode() {
    let recorder = Recorder::default();
    let stale = btc_ticker(fixed_now() - Duration::hours(2));
    let read = StubRead::ok("current_price", stale).recorded(&recorder);
    let write = EchoWrite::<PriceRecord>::new("store_price").recorded(&recorder);

    let config = LawConfig::default().with_staleness_bound(Duration::minutes(60));
    let combinator = combinator(config);
    let combination = combinator.bind(read, write).unwrap();
    let err = combination.execute((), ()).run().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::StaleData);
    assert_eq!(
        err.message,
        "Data is 120 minutes old, exceeding the 60-minute staleness bound"
    );
    assert_eq!(recorder.calls("store_price"), 0);
}

#[tokio::test]
async fn scenario_e_stale_current_price_is_a_warning_in_lenient_mode() {
    let recorder = Recorder::default();
    let stale = btc_ticker(fixed_now() - Duration::hours(2));
    let read = StubRead::ok("current_price", stale.clone()).recorded(&recorder);
    let write = EchoWrite::<PriceRecord>::new("store_price").recorded(&recorder);

    let config = LawConfig::default()
        .with_staleness_bound(Duration::minutes(60))
        .lenient();
    let combinator = combinator(config);
    let combination = combinator.bind(read, write).unwrap();
    let outcome = combination.execute((), ()).run().await.expect("lenient run succeeds");

    assert_eq!(outcome.value(), &stale);
    let warning = outcome.warning(&ErrorCode::StaleData).expect("staleness warning");
    assert_eq!(warning.law, LawKind::DataFreshness);
    assert_eq!(warning.severity, ViolationSeverity::Warning);
    assert_eq!(recorder.calls("store_price"), 1);
}
