//! # CIM Combinator
//!
//! Lawful read-write combinators for the Composable Information Machine.
//!
//! A combination binds an asynchronous *read* (fetch or observe data) to an
//! asynchronous *write* (persist or publish it), optionally through a pure
//! *transform*, and runs them as one pipeline under a fixed set of laws:
//! - **Type / Cardinality Coherence**: checked by the type system and by
//!   declared descriptors when binding, and against dynamic payloads before
//!   the write
//! - **Error Propagation / Temporal Execution / Data Flow Purity**: hold by
//!   construction of the pipeline
//! - **Attribution, Temporal Consistency, Freshness, Market Data**: evaluated
//!   against every read result before anything is written
//! - **Resource Conservation, Aggregation Coherence, Idempotency**: advisory,
//!   attached to successful outcomes
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use cim_combinator::market::PriceRecord;
//! use cim_combinator::{read_fn, write_fn, Attribution, Combinator, StructuredError};
//!
//! # tokio_test::block_on(async {
//! let combinator = Combinator::default();
//! let combination = combinator
//!     .bind(
//!         read_fn("current_price", |symbol: String| async move {
//!             let attribution = Attribution::new("coingecko", "binance", Utc::now());
//!             Ok::<_, StructuredError>(PriceRecord::new(symbol, 50_000.0, attribution))
//!         }),
//!         write_fn("store_price", |record: PriceRecord, _: ()| async move {
//!             Ok::<_, StructuredError>(record.price)
//!         }),
//!     )
//!     .unwrap();
//!
//! let outcome = combinator
//!     .execute(&combination, "BTC".to_string(), ())
//!     .run()
//!     .await
//!     .unwrap();
//! assert_eq!(*outcome.value(), 50_000.0);
//! # });
//! ```

#![warn(missing_docs)]

mod arguments;
mod combinator;
mod config;
mod errors;
mod execution;
mod operations;
mod outcome;
mod payload;
mod shape;
mod transform;
pub mod laws;
pub mod market;

// Re-export core types
pub use arguments::{Arguments, BatchArgs, DateRange, HistoricalQuery};
pub use combinator::{Combination, Combinator, Execution};
pub use config::{Clock, FixedClock, FreshnessMode, LawConfig, SystemClock};
pub use errors::{
    CombinatorError, CombinatorResult, ErrorCategory, ErrorCode, OperationResult, ResultExt,
    StructuredError,
};
pub use execution::{ExecutionState, ExecutionTrace, InvalidTransition, StageProbe, StageRecord};
pub use laws::{
    Law, LawChecker, LawContext, LawKind, LawReport, LawViolation, ViolationLocation,
    ViolationSeverity,
};
pub use operations::{
    read_fn, write_fn, FnRead, FnWrite, OperationDescriptor, ReadOperation, Semantics,
    WriteOperation,
};
pub use outcome::Outcome;
pub use payload::{record_from_json, Attribution, Cardinality, Payload, RecordKind, RecordView};
pub use shape::{FieldSpec, JsonKind, Shape};
pub use transform::{
    apply_guarded, map_fn, transform_async, transform_fn, AsyncFnTransform, FnTransform,
    IdentityTransform, Transform, TransformComposition, TransformError,
};
