//! Submission controller.
//!
//! The dashboard owns both image slots and the submission state machine:
//!
//! ```text
//! Idle ──begin_submit──▶ Pending ──settle──▶ Settled(Succeeded | Failed)
//!                           ▲                         │
//!                           └──────begin_submit───────┘
//! ```
//!
//! `begin_submit` refuses to leave `Idle`/`Settled` unless both images are
//! staged, and refuses outright while `Pending`. Entering `Pending` drops the
//! previous settlement, so a stale result is never shown next to a new
//! request.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::client::{PredictError, PredictionService, SubmitRequest};
use crate::prediction::PredictionResult;
use crate::selection::InputStage;

pub const GENERIC_FAILURE_NOTICE: &str =
    "An error occurred while trying to get the prediction. Check the log for details.";
pub const CANCELLED_NOTICE: &str = "Prediction cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    /// Flags mark which slots are still empty.
    #[error("Please upload both past and recent images!")]
    MissingImages { past: bool, recent: bool },
    #[error("A prediction is already in progress.")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Unreachable host, timeout, unreadable or malformed body.
    Transport,
    /// Non-success HTTP status.
    Protocol,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub detail: String,
}

impl SubmissionFailure {
    pub fn from_error(error: &PredictError) -> Self {
        let kind = match error {
            PredictError::Status { .. } => FailureKind::Protocol,
            PredictError::Cancelled => FailureKind::Cancelled,
            _ => FailureKind::Transport,
        };
        Self {
            kind,
            status: error.status_code(),
            detail: error.diagnostic(),
        }
    }

    /// What the operator is told. Transport and protocol failures read the same.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            FailureKind::Cancelled => CANCELLED_NOTICE,
            FailureKind::Transport | FailureKind::Protocol => GENERIC_FAILURE_NOTICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Succeeded(PredictionResult),
    Failed(SubmissionFailure),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Pending,
    Settled(Settlement),
}

impl SubmissionState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SubmissionState::Pending)
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            SubmissionState::Settled(Settlement::Succeeded(result)) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SubmissionFailure> {
        match self {
            SubmissionState::Settled(Settlement::Failed(failure)) => Some(failure),
            _ => None,
        }
    }
}

/// Triggers cancellation of the submission holding the paired [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that can never fire.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; stays pending forever if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            let cancelled = *self.rx.borrow_and_update();
            if cancelled {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// One POST to the service, bounded by `timeout` and abortable through `cancel`.
pub async fn run_submission<S: PredictionService>(
    service: &S,
    request: SubmitRequest,
    timeout: Duration,
    mut cancel: CancelSignal,
) -> Result<PredictionResult, PredictError> {
    if cancel.is_cancelled() {
        return Err(PredictError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PredictError::Cancelled),
        outcome = tokio::time::timeout(timeout, service.predict(request)) => match outcome {
            Ok(result) => result,
            Err(_) => Err(PredictError::TimedOut(timeout)),
        },
    }
}

/// All mutable state of the dashboard: the two image slots and the submission state.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub input: InputStage,
    state: SubmissionState,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.state.result()
    }

    pub fn failure(&self) -> Option<&SubmissionFailure> {
        self.state.failure()
    }

    /// Validates the slots and enters `Pending`. On rejection nothing changes.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SubmitRejected> {
        if self.is_busy() {
            tracing::debug!("submit ignored, a prediction is already pending");
            return Err(SubmitRejected::Busy);
        }

        let Some((past, recent)) = self.input.both() else {
            let rejected = SubmitRejected::MissingImages {
                past: !self.input.past().is_set(),
                recent: !self.input.recent().is_set(),
            };
            tracing::warn!(?rejected, "submit rejected");
            return Err(rejected);
        };

        let request = SubmitRequest {
            past: past.clone(),
            recent: recent.clone(),
        };

        tracing::info!(
            past = %request.past.name,
            recent = %request.recent.name,
            "submitting images for prediction"
        );
        self.state = SubmissionState::Pending;
        Ok(request)
    }

    /// Records the outcome of the pending call. Returns `false` if nothing was pending.
    pub fn settle(&mut self, outcome: Result<PredictionResult, PredictError>) -> bool {
        if !self.is_busy() {
            tracing::warn!("settle called with no pending submission");
            return false;
        }
        self.finish(outcome);
        true
    }

    /// `begin_submit`, the request, and `settle` in one call.
    ///
    /// Not cancel-safe: dropping this future after it starts leaves the state
    /// `Pending`. Stop a request through the `CancelSignal` and let it settle.
    pub async fn submit<S: PredictionService>(
        &mut self,
        service: &S,
        timeout: Duration,
        cancel: CancelSignal,
    ) -> Result<&SubmissionState, SubmitRejected> {
        let request = self.begin_submit()?;
        let outcome = run_submission(service, request, timeout, cancel).await;
        self.finish(outcome);
        Ok(&self.state)
    }

    fn finish(&mut self, outcome: Result<PredictionResult, PredictError>) {
        let settlement = match outcome {
            Ok(result) => {
                tracing::info!(status = ?result.status, "prediction received");
                Settlement::Succeeded(result)
            }
            Err(error) => {
                let failure = SubmissionFailure::from_error(&error);
                match failure.kind {
                    FailureKind::Cancelled => tracing::info!("prediction cancelled"),
                    _ => tracing::error!(
                        kind = ?failure.kind,
                        status = ?failure.status,
                        detail = %failure.detail,
                        "prediction failed"
                    ),
                }
                Settlement::Failed(failure)
            }
        };
        self.state = SubmissionState::Settled(settlement);
    }
}
