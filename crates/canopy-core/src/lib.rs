pub mod client;
pub mod config;
pub mod export;
pub mod prediction;
pub mod selection;
pub mod submission;
pub mod view;

// Re-export main types for convenience
pub use client::{PredictClient, PredictError, PredictionService, SubmitRequest};
pub use config::Config;
pub use export::export_generated_images;
pub use prediction::PredictionResult;
pub use selection::{ImageSelection, InputStage, Slot, StagedImage};
pub use submission::{
    cancel_pair, run_submission, CancelHandle, CancelSignal, Dashboard, FailureKind, Settlement,
    SubmissionFailure, SubmissionState, SubmitRejected,
};
pub use view::{ImageBlock, MetricRow, Raster, ResultView};
