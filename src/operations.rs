// Copyright 2025 Cowboy AI, LLC.

//! Read and write operations
//!
//! Operations are the caller-supplied halves of a combination. The engine
//! only relies on their shape: a read turns arguments into an
//! [`OperationResult`] of data, a write turns a payload plus arguments into an
//! [`OperationResult`] of its own result. Each operation also describes
//! itself through an [`OperationDescriptor`] so the construction-time laws
//! have something to check.
//!
//! Closures can be lifted into operations with [`read_fn`] and [`write_fn`].

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::arguments::Arguments;
use crate::errors::OperationResult;
use crate::payload::{Cardinality, Payload};
use crate::shape::Shape;

/// Whether an operation deals in live or archived data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semantics {
    /// Latest state; subject to the freshness law
    Current,
    /// Archived data; exempt from freshness
    Historical,
    /// Not stated and not inferable from the name
    #[default]
    Unspecified,
}

impl Semantics {
    const CURRENT_MARKERS: [&'static str; 6] =
        ["current", "latest", "live", "realtime", "ticker", "spot"];
    const HISTORICAL_MARKERS: [&'static str; 7] = [
        "historical",
        "history",
        "range",
        "ohlc",
        "candle",
        "candles",
        "archive",
    ];

    /// Infer semantics from an operation name
    ///
    /// Markers match whole words of a snake_case, kebab-case or camelCase
    /// name, so `delivery_quotes` is not "live". Two adjacent words also
    /// match when joined (`getRealTimeQuote`). Historical markers win over
    /// current ones, so `historical_spot_prices` is historical.
    pub fn infer(name: &str) -> Self {
        let words = words(name);
        let joined: Vec<String> = words.windows(2).map(|pair| pair.concat()).collect();
        let has = |markers: &[&str]| {
            words
                .iter()
                .chain(&joined)
                .any(|word| markers.contains(&word.as_str()))
        };

        if has(&Self::HISTORICAL_MARKERS) {
            Semantics::Historical
        } else if has(&Self::CURRENT_MARKERS) {
            Semantics::Current
        } else {
            Semantics::Unspecified
        }
    }
}

/// Lowercase words of an identifier, split on separators and case changes
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut word = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        }

        // `getCurrent` splits before `C`; `OHLCData` splits before `D`.
        let starts_word = c.is_ascii_uppercase()
            && i > 0
            && match chars[i - 1] {
                prev if prev.is_ascii_lowercase() || prev.is_ascii_digit() => true,
                prev if prev.is_ascii_uppercase() => {
                    chars.get(i + 1).is_some_and(char::is_ascii_lowercase)
                }
                _ => false,
            };
        if starts_word && !word.is_empty() {
            words.push(std::mem::take(&mut word));
        }
        word.push(c.to_ascii_lowercase());
    }

    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// Self-description of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation name, used in logs and messages
    pub name: String,
    /// Current or historical semantics
    pub semantics: Semantics,
    /// What the read produces or the write accepts
    pub cardinality: Cardinality,
    /// Declared JSON shape of the payload, for dynamic payloads
    pub shape: Option<Shape>,
    /// Name of an equivalent batch operation
    pub batch_alternative: Option<String>,
    /// Whether the operation is safe to retry with the same input
    pub idempotent: bool,
}

impl OperationDescriptor {
    /// Descriptor with semantics inferred from the name and single cardinality
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            semantics: Semantics::infer(&name),
            name,
            cardinality: Cardinality::Single,
            shape: None,
            batch_alternative: None,
            idempotent: true,
        }
    }

    /// Descriptor whose cardinality follows the payload type
    pub fn for_payload<P: Payload>(name: impl Into<String>) -> Self {
        Self::new(name).with_cardinality(P::cardinality())
    }

    /// Override the semantics
    pub fn with_semantics(mut self, semantics: Semantics) -> Self {
        self.semantics = semantics;
        self
    }

    /// Override the cardinality
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Declare the payload shape
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Name the batch operation serving the same data
    pub fn with_batch_alternative(mut self, name: impl Into<String>) -> Self {
        self.batch_alternative = Some(name.into());
        self
    }

    /// Mark the operation as unsafe to retry
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }
}

/// Fetches data; must be safe to invoke repeatedly with the same arguments
#[async_trait]
pub trait ReadOperation<A, D>: Send + Sync
where
    A: Arguments,
    D: Payload,
{
    /// Self-description used by the construction-time laws
    fn descriptor(&self) -> OperationDescriptor;

    /// Perform the read
    async fn read(&self, args: A) -> OperationResult<D>;
}

/// Persists or publishes a payload; should be safe to retry with the same payload
#[async_trait]
pub trait WriteOperation<D, W, R>: Send + Sync
where
    D: Payload,
    W: Arguments,
    R: Send + 'static,
{
    /// Self-description used by the construction-time laws
    fn descriptor(&self) -> OperationDescriptor;

    /// Perform the write
    async fn write(&self, payload: D, args: W) -> OperationResult<R>;
}

/// Read operation backed by a closure
pub struct FnRead<F, A, D> {
    descriptor: OperationDescriptor,
    f: F,
    _marker: PhantomData<fn(A) -> D>,
}

/// Lift an async closure into a [`ReadOperation`]
///
/// ```rust
/// use cim_combinator::{read_fn, OperationResult, ReadOperation};
///
/// let read = read_fn("current_price", |symbol: String| async move {
///     OperationResult::Ok(symbol.len() as u64)
/// });
/// assert_eq!(read.descriptor().name, "current_price");
/// ```
pub fn read_fn<A, D, F, Fut>(name: impl Into<String>, f: F) -> FnRead<F, A, D>
where
    A: Arguments,
    D: Payload,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = OperationResult<D>> + Send + 'static,
{
    FnRead {
        descriptor: OperationDescriptor::for_payload::<D>(name),
        f,
        _marker: PhantomData,
    }
}

impl<F, A, D> FnRead<F, A, D> {
    /// Replace the descriptor
    pub fn with_descriptor(mut self, descriptor: OperationDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Declare current semantics
    pub fn current(mut self) -> Self {
        self.descriptor.semantics = Semantics::Current;
        self
    }

    /// Declare historical semantics
    pub fn historical(mut self) -> Self {
        self.descriptor.semantics = Semantics::Historical;
        self
    }

    /// Declare the produced cardinality
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.descriptor.cardinality = cardinality;
        self
    }

    /// Declare the produced shape
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.descriptor.shape = Some(shape);
        self
    }

    /// Name the batch operation serving the same data
    pub fn with_batch_alternative(mut self, name: impl Into<String>) -> Self {
        self.descriptor.batch_alternative = Some(name.into());
        self
    }
}

#[async_trait]
impl<F, A, D, Fut> ReadOperation<A, D> for FnRead<F, A, D>
where
    A: Arguments,
    D: Payload,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = OperationResult<D>> + Send + 'static,
{
    fn descriptor(&self) -> OperationDescriptor {
        self.descriptor.clone()
    }

    async fn read(&self, args: A) -> OperationResult<D> {
        (self.f)(args).await
    }
}

/// Write operation backed by a closure
pub struct FnWrite<F, D, W, R> {
    descriptor: OperationDescriptor,
    f: F,
    _marker: PhantomData<fn(D, W) -> R>,
}

/// Lift an async closure into a [`WriteOperation`]
pub fn write_fn<D, W, R, F, Fut>(name: impl Into<String>, f: F) -> FnWrite<F, D, W, R>
where
    D: Payload,
    W: Arguments,
    R: Send + 'static,
    F: Fn(D, W) -> Fut + Send + Sync,
    Fut: Future<Output = OperationResult<R>> + Send + 'static,
{
    FnWrite {
        descriptor: OperationDescriptor::for_payload::<D>(name),
        f,
        _marker: PhantomData,
    }
}

impl<F, D, W, R> FnWrite<F, D, W, R> {
    /// Replace the descriptor
    pub fn with_descriptor(mut self, descriptor: OperationDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Declare the accepted cardinality
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.descriptor.cardinality = cardinality;
        self
    }

    /// Declare the accepted shape
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.descriptor.shape = Some(shape);
        self
    }

    /// Mark the write as unsafe to retry
    pub fn non_idempotent(mut self) -> Self {
        self.descriptor.idempotent = false;
        self
    }
}

#[async_trait]
impl<F, D, W, R, Fut> WriteOperation<D, W, R> for FnWrite<F, D, W, R>
where
    D: Payload,
    W: Arguments,
    R: Send + 'static,
    F: Fn(D, W) -> Fut + Send + Sync,
    Fut: Future<Output = OperationResult<R>> + Send + 'static,
{
    fn descriptor(&self) -> OperationDescriptor {
        self.descriptor.clone()
    }

    async fn write(&self, payload: D, args: W) -> OperationResult<R> {
        (self.f)(payload, args).await
    }
}
