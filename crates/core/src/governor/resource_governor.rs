use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::pipeline_coordinator::PipelineCoordinator;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::responses::{CropResponse, UploadResponse};
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::{
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_QUEUE_CAPACITY,
};
use crate::shared::geometry::Rect;

use super::admission_gate::{AdmissionError, AdmissionGate};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GovernorConfig {
    pub max_concurrent: usize,
    /// Callers allowed to wait for a slot; `0` rejects as soon as all
    /// slots are taken.
    pub queue_capacity: usize,
    /// Budget for queue wait plus execution.
    pub call_timeout: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_CALLS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernorConfigError {
    #[error("max_concurrent must be at least 1")]
    ZeroConcurrency,
    #[error("call_timeout must be positive")]
    ZeroTimeout,
}

/// Point-in-time load report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernorStatus {
    pub in_flight: usize,
    pub queued: usize,
    pub max_concurrent: usize,
    pub queue_capacity: usize,
}

/// Bounds concurrency and latency of pipeline calls.
///
/// Every admitted call runs on its own thread holding a gate permit. When
/// the budget runs out the caller gets [`PipelineError::Timeout`] at once;
/// the worker is told to stop and keeps its permit until it actually does,
/// so `in_flight` always counts real work.
pub struct ResourceGovernor {
    coordinator: Arc<PipelineCoordinator>,
    gate: Arc<AdmissionGate>,
    config: GovernorConfig,
}

impl ResourceGovernor {
    pub fn new(
        coordinator: Arc<PipelineCoordinator>,
        config: GovernorConfig,
    ) -> Result<Self, GovernorConfigError> {
        if config.max_concurrent == 0 {
            return Err(GovernorConfigError::ZeroConcurrency);
        }
        if config.call_timeout.is_zero() {
            return Err(GovernorConfigError::ZeroTimeout);
        }
        Ok(Self {
            coordinator,
            gate: Arc::new(AdmissionGate::new(
                config.max_concurrent,
                config.queue_capacity,
            )),
            config,
        })
    }

    pub fn config(&self) -> GovernorConfig {
        self.config
    }

    pub fn process_upload(&self, raw: Vec<u8>) -> Result<UploadResponse, PipelineError> {
        self.run(move |coordinator, cancel| coordinator.process_upload(&raw, cancel))
    }

    pub fn process_crop(
        &self,
        encoded: String,
        rects: Vec<Rect>,
    ) -> Result<CropResponse, PipelineError> {
        self.run(move |coordinator, cancel| coordinator.process_crop(&encoded, &rects, cancel))
    }

    pub fn status(&self) -> GovernorStatus {
        GovernorStatus {
            in_flight: self.gate.in_flight(),
            queued: self.gate.queued(),
            max_concurrent: self.config.max_concurrent,
            queue_capacity: self.config.queue_capacity,
        }
    }

    fn run<T, F>(&self, call: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce(&PipelineCoordinator, &CancellationToken) -> Result<T, PipelineError>
            + Send
            + 'static,
    {
        let deadline = Instant::now() + self.config.call_timeout;
        let permit = self.gate.acquire(deadline).map_err(|e| {
            log::warn!("Call not admitted: {e}");
            match e {
                AdmissionError::Busy => PipelineError::Busy,
                AdmissionError::TimedOut => PipelineError::Timeout,
            }
        })?;

        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let coordinator = Arc::clone(&self.coordinator);
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);

        thread::Builder::new()
            .name("facemark-call".into())
            .spawn(move || {
                let result = call(&coordinator, &worker_cancel);
                drop(permit);
                let _ = result_tx.send(result);
            })
            .map_err(|e| {
                log::error!("Failed to start pipeline worker: {e}");
                PipelineError::WorkerFailed
            })?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        match result_rx.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                log::warn!(
                    "Call exceeded {}ms budget, cancelling",
                    self.config.call_timeout.as_millis()
                );
                Err(PipelineError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("Pipeline worker exited without a result");
                Err(PipelineError::WorkerFailed)
            }
        }
    }
}
