// Copyright 2025 Cowboy AI, LLC.

//! Transform step between read and write
//!
//! A transform maps the read's output to the write's input. Transforms only
//! ever receive a shared reference to their input, so they cannot mutate the
//! snapshot the laws were checked against, and evaluating one twice on the
//! same input yields the same result.
//!
//! Transforms compose with [`Transform::then`]; [`IdentityTransform`] is the
//! unit of composition and is what [`crate::Combinator::bind`] uses when no
//! transform is supplied.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;

use crate::errors::StructuredError;

/// Failure inside a transform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The transform returned an error
    #[error("{0}")]
    Failed(String),

    /// The transform panicked
    #[error("transform panicked: {0}")]
    Panicked(String),
}

impl TransformError {
    /// Failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        TransformError::Failed(message.into())
    }
}

impl From<TransformError> for StructuredError {
    fn from(err: TransformError) -> Self {
        StructuredError::transformation(err.to_string())
    }
}

/// Pure mapping from the read output to the write input
#[async_trait]
pub trait Transform<I, O>: Send + Sync
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    /// Apply the transform
    async fn apply(&self, input: &I) -> Result<O, TransformError>;

    /// Human-readable description
    fn description(&self) -> String;

    /// Whether the transform returns its input unchanged
    fn is_identity(&self) -> bool {
        false
    }

    /// Run `next` on the output of this transform
    fn then<P, G>(self, next: G) -> TransformComposition<Self, G, I, O, P>
    where
        Self: Sized,
        G: Transform<O, P>,
        P: Send + Sync + 'static,
    {
        TransformComposition::new(self, next)
    }
}

/// Apply a transform, converting a panic into [`TransformError::Panicked`]
pub async fn apply_guarded<I, O>(
    transform: &dyn Transform<I, O>,
    input: &I,
) -> Result<O, TransformError>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    match AssertUnwindSafe(transform.apply(input)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(TransformError::Panicked(panic_message(panic.as_ref()))),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Identity transform
pub struct IdentityTransform<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> IdentityTransform<T> {
    /// Create an identity transform that returns a copy of its input
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for IdentityTransform<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Transform<T, T> for IdentityTransform<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn apply(&self, input: &T) -> Result<T, TransformError> {
        Ok(input.clone())
    }

    fn description(&self) -> String {
        "identity".to_string()
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Transform backed by a synchronous closure
pub struct FnTransform<F, I, O, E> {
    description: String,
    f: F,
    _phantom: PhantomData<fn(&I) -> (O, E)>,
}

/// Lift a fallible closure into a [`Transform`]
pub fn transform_fn<I, O, E, F>(description: impl Into<String>, f: F) -> FnTransform<F, I, O, E>
where
    F: Fn(&I) -> Result<O, E> + Send + Sync,
    E: Display,
{
    FnTransform {
        description: description.into(),
        f,
        _phantom: PhantomData,
    }
}

/// Lift an infallible closure into a [`Transform`]
pub fn map_fn<I, O, F>(
    description: impl Into<String>,
    f: F,
) -> FnTransform<impl Fn(&I) -> Result<O, TransformError> + Send + Sync, I, O, TransformError>
where
    F: Fn(&I) -> O + Send + Sync,
{
    transform_fn(description, move |input: &I| Ok(f(input)))
}

#[async_trait]
impl<F, I, O, E> Transform<I, O> for FnTransform<F, I, O, E>
where
    F: Fn(&I) -> Result<O, E> + Send + Sync,
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
    E: Display,
{
    async fn apply(&self, input: &I) -> Result<O, TransformError> {
        (self.f)(input).map_err(|err| TransformError::Failed(err.to_string()))
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Transform backed by an async closure
///
/// The closure receives an owned copy of the input.
pub struct AsyncFnTransform<F, I, O> {
    description: String,
    f: F,
    _phantom: PhantomData<fn(I) -> O>,
}

/// Lift an async closure into a [`Transform`]
pub fn transform_async<I, O, E, F, Fut>(
    description: impl Into<String>,
    f: F,
) -> AsyncFnTransform<F, I, O>
where
    I: Clone,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    E: Display,
{
    AsyncFnTransform {
        description: description.into(),
        f,
        _phantom: PhantomData,
    }
}

#[async_trait]
impl<F, I, O, E, Fut> Transform<I, O> for AsyncFnTransform<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
    E: Display,
{
    async fn apply(&self, input: &I) -> Result<O, TransformError> {
        (self.f)(input.clone())
            .await
            .map_err(|err| TransformError::Failed(err.to_string()))
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Composition of two transforms
pub struct TransformComposition<F, G, A, B, C> {
    first: F,
    second: G,
    _phantom: PhantomData<fn(&A) -> (B, C)>,
}

impl<F, G, A, B, C> TransformComposition<F, G, A, B, C>
where
    F: Transform<A, B>,
    G: Transform<B, C>,
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    /// Create a new composition
    pub fn new(first: F, second: G) -> Self {
        Self {
            first,
            second,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, G, A, B, C> Transform<A, C> for TransformComposition<F, G, A, B, C>
where
    F: Transform<A, B>,
    G: Transform<B, C>,
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    async fn apply(&self, input: &A) -> Result<C, TransformError> {
        let intermediate = self.first.apply(input).await?;
        self.second.apply(&intermediate).await
    }

    fn description(&self) -> String {
        format!("{} ∘ {}", self.second.description(), self.first.description())
    }

    fn is_identity(&self) -> bool {
        self.first.is_identity() && self.second.is_identity()
    }
}
