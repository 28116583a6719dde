#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use cim_combinator::market::PriceRecord;
use cim_combinator::{
    Attribution, Combinator, FixedClock, LawConfig, OperationDescriptor, OperationResult, Payload,
    ReadOperation, StructuredError, WriteOperation,
};

/// Evaluation instant shared by every test combinator
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Combinator evaluating time-dependent laws at [`fixed_now`]
pub fn combinator(config: LawConfig) -> Combinator {
    Combinator::new(config)
        .expect("valid config")
        .with_clock(FixedClock(fixed_now()))
}

/// The ticker from scenario A: consistent OHLC, attributed, fresh
pub fn btc_ticker(last_updated: DateTime<Utc>) -> PriceRecord {
    PriceRecord::new("BTC", 50000.0, Attribution::new("x", "y", last_updated))
        .with_range(50200.0, 51000.0, 49000.0, 50500.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Finish,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub operation: String,
    pub phase: Phase,
    pub at: Instant,
}

/// Shared log of operation starts and finishes
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Event>>>);

impl Recorder {
    pub fn record(&self, operation: &str, phase: Phase) {
        self.0.lock().unwrap().push(Event {
            operation: operation.to_string(),
            phase,
            at: Instant::now(),
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.operation == operation && e.phase == Phase::Start)
            .count()
    }

    pub fn at(&self, operation: &str, phase: Phase) -> Option<Instant> {
        self.events()
            .into_iter()
            .find(|e| e.operation == operation && e.phase == phase)
            .map(|e| e.at)
    }
}

/// Read returning a canned result
pub struct StubRead<D> {
    descriptor: OperationDescriptor,
    result: OperationResult<D>,
    delay: Option<Duration>,
    recorder: Recorder,
}

impl<D: Payload + Clone> StubRead<D> {
    pub fn ok(name: &str, value: D) -> Self {
        Self::with_result(name, Ok(value))
    }

    pub fn err(name: &str, error: StructuredError) -> Self {
        Self::with_result(name, Err(error))
    }

    fn with_result(name: &str, result: OperationResult<D>) -> Self {
        Self {
            descriptor: OperationDescriptor::for_payload::<D>(name),
            result,
            delay: None,
            recorder: Recorder::default(),
        }
    }

    pub fn describe(mut self, f: impl FnOnce(OperationDescriptor) -> OperationDescriptor) -> Self {
        self.descriptor = f(self.descriptor);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn recorded(mut self, recorder: &Recorder) -> Self {
        self.recorder = recorder.clone();
        self
    }
}

#[async_trait]
impl<D: Payload + Clone> ReadOperation<(), D> for StubRead<D> {
    fn descriptor(&self) -> OperationDescriptor {
        self.descriptor.clone()
    }

    async fn read(&self, _args: ()) -> OperationResult<D> {
        self.recorder.record(&self.descriptor.name, Phase::Start);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.result.clone();
        self.recorder.record(&self.descriptor.name, Phase::Finish);
        result
    }
}

/// Write echoing its payload, or failing with a canned error
pub struct EchoWrite<D> {
    descriptor: OperationDescriptor,
    failure: Option<StructuredError>,
    delay: Option<Duration>,
    recorder: Recorder,
    received: Arc<Mutex<Vec<D>>>,
}

impl<D: Payload + Clone> EchoWrite<D> {
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: OperationDescriptor::for_payload::<D>(name),
            failure: None,
            delay: None,
            recorder: Recorder::default(),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(mut self, error: StructuredError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn describe(mut self, f: impl FnOnce(OperationDescriptor) -> OperationDescriptor) -> Self {
        self.descriptor = f(self.descriptor);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn recorded(mut self, recorder: &Recorder) -> Self {
        self.recorder = recorder.clone();
        self
    }

    /// Payloads the write has received, shared with the stub
    pub fn received(&self) -> Arc<Mutex<Vec<D>>> {
        Arc::clone(&self.received)
    }
}

#[async_trait]
impl<D: Payload + Clone> WriteOperation<D, (), D> for EchoWrite<D> {
    fn descriptor(&self) -> OperationDescriptor {
        self.descriptor.clone()
    }

    async fn write(&self, payload: D, _args: ()) -> OperationResult<D> {
        self.recorder.record(&self.descriptor.name, Phase::Start);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.received.lock().unwrap().push(payload.clone());
        self.recorder.record(&self.descriptor.name, Phase::Finish);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(payload),
        }
    }
}
