mod support;

use proptest::prelude::*;

use cim_combinator::market::PriceRecord;
use cim_combinator::{Attribution, ErrorCategory, ErrorCode, LawConfig, StructuredError};

use support::{combinator, fixed_now, EchoWrite, Recorder, StubRead};

fn run(
    read: StubRead<PriceRecord>,
    recorder: &Recorder,
) -> Result<PriceRecord, StructuredError> {
    let combination = combinator(LawConfig::default())
        .bind(
            read.recorded(recorder),
            EchoWrite::<PriceRecord>::new("store_price").recorded(recorder),
        )
        .expect("single read binds to single write");
    tokio_test::block_on(combination.execute((), ()).run()).map(|outcome| outcome.into_value())
}

fn ticker(price: f64, open: f64, high: f64, low: f64, close: f64) -> PriceRecord {
    PriceRecord::new("BTC", price, Attribution::new("x", "y", fixed_now()))
        .with_range(open, high, low, close)
}

fn error_code() -> impl Strategy<Value = String> {
    "[A-Z][A-Z_]{2,20}"
}

proptest! {
    #[test]
    fn failed_read_never_reaches_the_write(code in error_code(), message in ".{0,40}") {
        let recorder = Recorder::default();
        let failure = StructuredError::system(code.as_str(), message);

        let result = run(StubRead::err("current_price", failure.clone()), &recorder);

        prop_assert_eq!(result, Err(failure));
        prop_assert_eq!(recorder.calls("store_price"), 0);
    }

    #[test]
    fn non_positive_price_short_circuits(price in -1.0e6f64..=0.0) {
        let recorder = Recorder::default();

        let result = run(StubRead::ok("current_price", ticker(price, 10.0, 12.0, 9.0, 11.0)), &recorder);

        let err = result.unwrap_err();
        prop_assert_eq!(err.category, ErrorCategory::Validation);
        prop_assert_eq!(err.code, ErrorCode::MarketDataInvalid);
        prop_assert!(err.message.contains("Price must be positive"));
        prop_assert_eq!(recorder.calls("store_price"), 0);
    }

    #[test]
    fn inverted_high_low_short_circuits(low in 1.0f64..1.0e6, gap in 0.01f64..1.0e3) {
        let recorder = Recorder::default();
        let high = low - gap.min(low / 2.0);

        let result = run(StubRead::ok("current_price", ticker(low, low, high, low, low)), &recorder);

        let err = result.unwrap_err();
        prop_assert!(err.is_validation());
        prop_assert!(err.message.contains("must be greater than or equal to low"));
        prop_assert_eq!(recorder.calls("store_price"), 0);
    }

    #[test]
    fn consistent_records_are_written(
        low in 1.0f64..1.0e5,
        spread in 0.0f64..1.0e4,
        open_at in 0.0f64..=1.0,
        close_at in 0.0f64..=1.0,
    ) {
        let recorder = Recorder::default();
        let high = low + spread;
        let record = ticker(low + spread * close_at, low + spread * open_at, high, low, low + spread * close_at);

        let result = run(StubRead::ok("current_price", record.clone()), &recorder);

        prop_assert_eq!(result, Ok(record));
        prop_assert_eq!(recorder.calls("store_price"), 1);
    }

    #[test]
    fn missing_source_or_exchange_fails_attribution(drop_source in any::<bool>(), price in 1.0f64..1.0e6) {
        let recorder = Recorder::default();
        let mut record = ticker(price, price, price, price, price);
        if drop_source {
            record.source.clear();
        } else {
            record.exchange_id = "  ".to_string();
        }

        let result = run(StubRead::ok("current_price", record), &recorder);

        prop_assert_eq!(result.unwrap_err().code, ErrorCode::MissingAttribution);
        prop_assert_eq!(recorder.calls("store_price"), 0);
    }

    #[test]
    fn repeated_execution_is_deterministic(price in -10.0f64..10.0) {
        let combination = combinator(LawConfig::default())
            .bind(
                StubRead::ok("current_price", ticker(price, 1.0, 2.0, 0.5, 1.5)),
                EchoWrite::<PriceRecord>::new("store_price"),
            )
            .expect("binds");
        let execution = combination.execute((), ());

        let first = tokio_test::block_on(execution.run());
        let second = tokio_test::block_on(execution.run());
        prop_assert_eq!(first, second);
    }
}
