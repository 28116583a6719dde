// Copyright 2025 Cowboy AI, LLC.

//! The combinator
//!
//! [`Combinator::bind`] checks the construction-time laws and produces a
//! [`Combination`]: an immutable, cheaply clonable template. Each call to
//! [`Combinator::execute`] turns a combination plus concrete arguments into a
//! deferred [`Execution`]; nothing runs until [`Execution::run`] is awaited.
//!
//! A run always walks the stages in order:
//!
//! 1. read; a failure is returned unchanged and the write never runs
//! 2. validate the read output against every enabled payload law
//! 3. transform, then check shape, cardinality and attribution of its output
//! 4. write; its result or error is the run's result
//!
//! Errors the engine originates itself carry the failing stage in
//! `details["stage"]`. Collaborator errors are forwarded untouched; a
//! collaborator that panics is reported as an `OPERATION_PANICKED` system
//! error instead of unwinding out of the run.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::arguments::Arguments;
use crate::config::{Clock, LawConfig, SystemClock};
use crate::errors::{CombinatorResult, OperationResult, StructuredError};
use crate::execution::{ExecutionState, ExecutionTrace, StageProbe};
use crate::laws::{advisory, attribution, coherence};
use crate::laws::{LawChecker, LawContext, LawKind, LawReport, LawViolation, ViolationSeverity};
use crate::operations::{OperationDescriptor, ReadOperation, WriteOperation};
use crate::outcome::Outcome;
use crate::payload::{Attribution, Cardinality, Payload};
use crate::transform::{apply_guarded, panic_message, IdentityTransform, Transform};

/// Builds combinations under one law configuration
#[derive(Debug, Clone)]
pub struct Combinator {
    config: LawConfig,
    clock: Arc<dyn Clock>,
}

impl Default for Combinator {
    fn default() -> Self {
        Self {
            config: LawConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl Combinator {
    /// Create a combinator; the configuration is validated first
    pub fn new(config: LawConfig) -> CombinatorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Evaluate time-dependent laws against `clock`
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &LawConfig {
        &self.config
    }

    /// Bind a read directly to a write
    pub fn bind<A, D, W, R, RO, WO>(&self, read: RO, write: WO) -> CombinatorResult<Combination<A, W, R>>
    where
        A: Arguments,
        D: Payload + Clone,
        W: Arguments,
        R: Send + 'static,
        RO: ReadOperation<A, D> + 'static,
        WO: WriteOperation<D, W, R> + 'static,
    {
        self.bind_with(read, IdentityTransform::<D>::new(), write)
    }

    /// Bind a read to a write through a transform
    ///
    /// Fails immediately when Type or Cardinality Coherence is violated by
    /// the declared descriptors.
    pub fn bind_with<A, D, T, W, R, RO, TO, WO>(
        &self,
        read: RO,
        transform: TO,
        write: WO,
    ) -> CombinatorResult<Combination<A, W, R>>
    where
        A: Arguments,
        D: Payload,
        T: Payload,
        W: Arguments,
        R: Send + 'static,
        RO: ReadOperation<A, D> + 'static,
        TO: Transform<D, T> + 'static,
        WO: WriteOperation<T, W, R> + 'static,
    {
        let read_descriptor = read.descriptor();
        let write_descriptor = write.descriptor();
        let transform_description = transform.description();

        // Through an identity the write sees exactly what the read declared.
        let (producer, produced, produced_shape) = if transform.is_identity() {
            (
                read_descriptor.name.as_str(),
                read_descriptor.cardinality,
                read_descriptor.shape.as_ref(),
            )
        } else {
            (transform_description.as_str(), T::cardinality(), None)
        };

        if self.config.is_enabled(LawKind::CardinalityCoherence) {
            coherence::check_cardinality(producer, produced, &write_descriptor)?;
        }
        if self.config.is_enabled(LawKind::TypeCoherence) {
            coherence::check_types(producer, produced_shape, &write_descriptor)?;
        }

        let advisories: Vec<LawViolation> = [
            (
                LawKind::ResourceConservation,
                advisory::resource_conservation(&read_descriptor),
            ),
            (LawKind::Idempotency, advisory::idempotency(&write_descriptor)),
        ]
        .into_iter()
        .filter(|(law, _)| self.config.is_enabled(*law))
        .filter_map(|(_, advice)| advice)
        .collect();

        let name = format!("{} -> {}", read_descriptor.name, write_descriptor.name);
        for advice in &advisories {
            warn!(combination = %name, law = %advice.law, "{}", advice.message);
        }

        let checker = LawChecker::new(self.config.clone());
        let laws = checker.laws();
        info!(
            combination = %name,
            transform = %transform_description,
            laws = laws.len(),
            "Bound combination"
        );

        let pipeline = Stages {
            read: Box::new(read),
            transform: Box::new(transform),
            write: Box::new(write),
            read_descriptor: read_descriptor.clone(),
            write_descriptor: write_descriptor.clone(),
            checker,
            clock: Arc::clone(&self.clock),
            advisories: advisories.clone(),
        };

        Ok(Combination {
            name,
            read: read_descriptor,
            write: write_descriptor,
            transform: transform_description,
            laws,
            advisories,
            pipeline: Arc::new(pipeline),
        })
    }

    /// Prepare one run of `combination`; nothing executes until it is awaited
    pub fn execute<A, W, R>(
        &self,
        combination: &Combination<A, W, R>,
        read_args: A,
        write_args: W,
    ) -> Execution<A, W, R>
    where
        A: Arguments,
        W: Arguments,
        R: Send + 'static,
    {
        combination.execute(read_args, write_args)
    }
}

/// A bound `(read, transform, write)` template
pub struct Combination<A, W, R> {
    name: String,
    read: OperationDescriptor,
    write: OperationDescriptor,
    transform: String,
    laws: Vec<LawKind>,
    advisories: Vec<LawViolation>,
    pipeline: Arc<dyn Pipeline<A, W, R>>,
}

impl<A, W, R> Combination<A, W, R>
where
    A: Arguments,
    W: Arguments,
    R: Send + 'static,
{
    /// `"read -> write"`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of the read operation
    pub fn read_descriptor(&self) -> &OperationDescriptor {
        &self.read
    }

    /// Descriptor of the write operation
    pub fn write_descriptor(&self) -> &OperationDescriptor {
        &self.write
    }

    /// Description of the transform
    pub fn transform_description(&self) -> &str {
        &self.transform
    }

    /// Payload laws evaluated on every run
    pub fn laws(&self) -> &[LawKind] {
        &self.laws
    }

    /// Advisories raised when the combination was bound
    pub fn advisories(&self) -> &[LawViolation] {
        &self.advisories
    }

    /// Prepare one run with concrete arguments
    pub fn execute(&self, read_args: A, write_args: W) -> Execution<A, W, R> {
        Execution {
            name: self.name.clone(),
            pipeline: Arc::clone(&self.pipeline),
            read_args,
            write_args,
        }
    }
}

impl<A, W, R> Clone for Combination<A, W, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            read: self.read.clone(),
            write: self.write.clone(),
            transform: self.transform.clone(),
            laws: self.laws.clone(),
            advisories: self.advisories.clone(),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<A, W, R> fmt::Debug for Combination<A, W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combination")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("laws", &self.laws)
            .field("advisories", &self.advisories.len())
            .finish()
    }
}

/// One deferred run of a combination
///
/// Running the same execution twice performs two independent runs with the
/// same arguments.
pub struct Execution<A, W, R> {
    name: String,
    pipeline: Arc<dyn Pipeline<A, W, R>>,
    read_args: A,
    write_args: W,
}

impl<A, W, R> Execution<A, W, R>
where
    A: Arguments,
    W: Arguments,
    R: Send + 'static,
{
    /// Run the pipeline to completion
    pub async fn run(&self) -> OperationResult<Outcome<R>> {
        self.run_probed(StageProbe::new()).await
    }

    /// Run the pipeline unless `cancel` completes first
    ///
    /// Cancellation drops whichever stage is suspended and resolves to a
    /// `CANCELLED` error naming that stage. Effects the interrupted write
    /// already committed are not rolled back.
    pub async fn run_until<C>(&self, cancel: C) -> OperationResult<Outcome<R>>
    where
        C: Future<Output = ()>,
    {
        let probe = StageProbe::new();
        tokio::select! {
            biased;
            _ = cancel => {
                let stage = probe.current();
                warn!(combination = %self.name, stage = stage.name(), "Execution cancelled");
                Err(StructuredError::cancelled(stage.name()))
            }
            result = self.run_probed(probe.clone()) => result,
        }
    }

    async fn run_probed(&self, probe: StageProbe) -> OperationResult<Outcome<R>> {
        let run_id = Uuid::new_v4();
        let span = info_span!("execution", combination = %self.name, run_id = %run_id);
        let mut trace = ExecutionTrace::new(run_id).with_probe(probe);

        let (value, warnings) = self
            .pipeline
            .run(self.read_args.clone(), self.write_args.clone(), &mut trace)
            .instrument(span)
            .await?;

        Ok(Outcome::new(value, warnings, trace))
    }
}

impl<A: Clone, W: Clone, R> Clone for Execution<A, W, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            pipeline: Arc::clone(&self.pipeline),
            read_args: self.read_args.clone(),
            write_args: self.write_args.clone(),
        }
    }
}

impl<A, W, R> fmt::Debug for Execution<A, W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution").field("combination", &self.name).finish()
    }
}

#[async_trait]
trait Pipeline<A, W, R>: Send + Sync {
    async fn run(
        &self,
        read_args: A,
        write_args: W,
        trace: &mut ExecutionTrace,
    ) -> OperationResult<(R, Vec<LawViolation>)>;
}

struct Stages<A, D, T, W, R> {
    read: Box<dyn ReadOperation<A, D>>,
    transform: Box<dyn Transform<D, T>>,
    write: Box<dyn WriteOperation<T, W, R>>,
    read_descriptor: OperationDescriptor,
    write_descriptor: OperationDescriptor,
    checker: LawChecker,
    clock: Arc<dyn Clock>,
    advisories: Vec<LawViolation>,
}

impl<A, D, T, W, R> Stages<A, D, T, W, R>
where
    A: Arguments,
    D: Payload,
    T: Payload,
    W: Arguments,
    R: Send + 'static,
{
    fn config(&self) -> &LawConfig {
        self.checker.config()
    }

    /// Shape, cardinality and attribution of the value about to be written
    fn guard(&self, value: &T, read_attribution: &[Option<Attribution>]) -> Option<StructuredError> {
        if self.config().is_enabled(LawKind::TypeCoherence) {
            let items = value.json_items();
            let mismatch = match T::cardinality() {
                Cardinality::Sequence => coherence::check_payload_items(&self.write_descriptor, &items),
                _ => items
                    .first()
                    .and_then(|json| coherence::check_payload_shape(&self.write_descriptor, json)),
            };
            if mismatch.is_some() {
                return mismatch;
            }
        }

        if self.config().is_enabled(LawKind::CardinalityCoherence) {
            let observed = value.observed_cardinality();
            if let Some(err) = coherence::check_observed_cardinality(&self.write_descriptor, observed) {
                return Some(err);
            }
        }

        if self.config().is_enabled(LawKind::AttributionPreservation) && !self.transform.is_identity() {
            let violations = attribution::check_preserved(read_attribution, &value.records());
            let report = LawReport {
                laws_checked: vec![LawKind::AttributionPreservation],
                violations,
                checked_at: self.clock.now(),
            };
            return report.to_error();
        }

        None
    }

    fn visible(&self, violations: impl IntoIterator<Item = LawViolation>) -> Vec<LawViolation> {
        let emit_advisories = self.config().emit_advisories;
        violations
            .into_iter()
            .filter(|v| emit_advisories || v.severity != ViolationSeverity::Info)
            .collect()
    }
}

/// Await a collaborator; the outer `Err` is a panic raised inside it
async fn contained<T, F>(
    operation: &str,
    call: F,
) -> Result<OperationResult<T>, StructuredError>
where
    F: Future<Output = OperationResult<T>>,
{
    AssertUnwindSafe(call).catch_unwind().await.map_err(|panic| {
        StructuredError::system(
            "OPERATION_PANICKED",
            format!("`{operation}` panicked: {}", panic_message(panic.as_ref())),
        )
        .with_detail("operation", operation)
    })
}

fn failed(trace: &mut ExecutionTrace, err: StructuredError) -> StructuredError {
    let stage = trace.fail();
    warn!(stage = stage.name(), code = %err.code, "{}", err.message);
    err.with_detail("stage", stage.name())
}

#[async_trait]
impl<A, D, T, W, R> Pipeline<A, W, R> for Stages<A, D, T, W, R>
where
    A: Arguments,
    D: Payload,
    T: Payload,
    W: Arguments,
    R: Send + 'static,
{
    async fn run(
        &self,
        read_args: A,
        write_args: W,
        trace: &mut ExecutionTrace,
    ) -> OperationResult<(R, Vec<LawViolation>)> {
        let date_range = read_args.date_range();
        let item_count = read_args.item_count();
        let mut warnings = self.advisories.clone();

        trace.advance(ExecutionState::Reading)?;
        let data = match contained(&self.read_descriptor.name, self.read.read(read_args)).await {
            Ok(Ok(data)) => data,
            Ok(Err(err)) => {
                trace.fail();
                debug!(operation = %self.read_descriptor.name, code = %err.code, "Read failed");
                return Err(err);
            }
            Err(panic) => return Err(failed(trace, panic)),
        };

        trace.advance(ExecutionState::Validating)?;
        let records = data.records();
        let report = self.checker.check(&LawContext {
            operation: &self.read_descriptor.name,
            records: &records,
            semantics: self.read_descriptor.semantics,
            date_range,
            now: self.clock.now(),
            config: self.config(),
        });
        if let Some(err) = report.to_error() {
            return Err(failed(trace, err));
        }
        warnings.extend(report.warnings().cloned());
        if self.config().is_enabled(LawKind::ResourceConservation) {
            warnings.extend(advisory::batch_arguments(&self.read_descriptor, item_count));
        }
        let read_attribution = attribution::snapshot(&records);

        trace.advance(ExecutionState::Transforming)?;
        let value = match apply_guarded(self.transform.as_ref(), &data).await {
            Ok(value) => value,
            Err(err) => {
                let err = StructuredError::from(err)
                    .with_detail("transform", self.transform.description());
                return Err(failed(trace, err));
            }
        };
        if let Some(err) = self.guard(&value, &read_attribution) {
            return Err(failed(trace, err));
        }

        trace.advance(ExecutionState::Writing)?;
        match contained(&self.write_descriptor.name, self.write.write(value, write_args)).await {
            Ok(Ok(result)) => {
                trace.advance(ExecutionState::Succeeded)?;
                debug!(warnings = warnings.len(), "Execution succeeded");
                Ok((result, self.visible(warnings)))
            }
            Ok(Err(err)) => {
                trace.fail();
                debug!(operation = %self.write_descriptor.name, code = %err.code, "Write failed");
                Err(err)
            }
            Err(panic) => Err(failed(trace, panic)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CombinatorError, ErrorCode};
    use crate::market::PriceRecord;
    use crate::operations::{read_fn, write_fn};
    use crate::payload::Cardinality;
    use chrono::Utc;

    fn price(value: f64) -> PriceRecord {
        PriceRecord::new("BTC", value, Attribution::new("coingecko", "binance", Utc::now()))
    }

    #[tokio::test]
    async fn test_bind_and_run() {
        let combinator = Combinator::default();
        let combination = combinator
            .bind(
                read_fn("current_price", |_: ()| async { Ok(price(100.0)) }),
                write_fn("store_price", |p: PriceRecord, _: ()| async move { Ok(p.price) }),
            )
            .unwrap();
        assert_eq!(combination.name(), "current_price -> store_price");
        assert_eq!(combination.transform_description(), "identity");

        let outcome = combinator.execute(&combination, (), ()).run().await.unwrap();
        assert_eq!(*outcome.value(), 100.0);
        assert_eq!(outcome.trace().current(), ExecutionState::Succeeded);
    }

    #[tokio::test]
    async fn test_execution_is_deferred() {
        let combinator = Combinator::default();
        let combination = combinator
            .bind(
                read_fn("current_price", |_: ()| async { Ok(price(100.0)) }),
                write_fn("store_price", |p: PriceRecord, _: ()| async move { Ok(p.price) }),
            )
            .unwrap();

        // Building an execution runs nothing; dropping it is harmless.
        let execution = combination.execute((), ());
        drop(execution);
    }

    #[test]
    fn test_bind_rejects_cardinality_mismatch() {
        let combinator = Combinator::default();
        let result = combinator.bind(
            read_fn("current_prices", |_: ()| async { Ok(vec![price(1.0)]) })
                .with_cardinality(Cardinality::Sequence),
            write_fn("store_price", |_: Vec<PriceRecord>, _: ()| async { Ok(()) })
                .with_cardinality(Cardinality::Single),
        );
        assert!(matches!(result, Err(CombinatorError::CardinalityMismatch { .. })));
    }

    #[tokio::test]
    async fn test_engine_errors_name_their_stage() {
        let combinator = Combinator::default();
        let combination = combinator
            .bind(
                read_fn("historical_price", |_: ()| async { Ok(price(-5.0)) }),
                write_fn("store_price", |_: PriceRecord, _: ()| async { Ok(()) }),
            )
            .unwrap();

        let err = combination.execute((), ()).run().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MarketDataInvalid);
        assert_eq!(err.detail("stage"), Some(&serde_json::json!("VALIDATING")));
    }

    #[tokio::test]
    async fn test_advisories_can_be_silenced() {
        let config = LawConfig {
            emit_advisories: false,
            ..LawConfig::default()
        };
        let combinator = Combinator::new(config).unwrap();
        let combination = combinator
            .bind(
                read_fn("historical_price", |_: ()| async { Ok(price(5.0)) }),
                write_fn("append_price", |_: PriceRecord, _: ()| async { Ok(()) }).non_idempotent(),
            )
            .unwrap();

        assert_eq!(combination.advisories().len(), 1);
        let outcome = combination.execute((), ()).run().await.unwrap();
        assert!(!outcome.has_warnings());
    }
}
