use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use canopy_core::{
    cancel_pair, export_generated_images, run_submission, CancelHandle, Config, Dashboard,
    FailureKind, ImageSelection, PredictClient, PredictError, PredictionResult, ResultView, Slot,
    StagedImage,
};
use canopy_core::view;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    PastImage,
    RecentImage,
    Submit,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::PastImage => Focus::RecentImage,
            Focus::RecentImage => Focus::Submit,
            Focus::Submit => Focus::PastImage,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::PastImage => Focus::Submit,
            Focus::RecentImage => Focus::PastImage,
            Focus::Submit => Focus::RecentImage,
        }
    }

    pub fn slot(self) -> Option<Slot> {
        match self {
            Focus::PastImage => Some(Slot::Past),
            Focus::RecentImage => Some(Slot::Recent),
            Focus::Submit => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// Modal message, dismissed by any key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub dashboard: Dashboard,

    // Path entry for each slot (the terminal stand-in for a file picker)
    pub past_path: String,
    pub recent_path: String,

    // In-flight submission
    pub submission_task: Option<JoinHandle<Result<PredictionResult, PredictError>>>,
    pub cancel_handle: Option<CancelHandle>,

    pub notice: Option<Notice>,
    /// Projection of the last settled result, built once per settlement.
    pub result_view: Option<ResultView>,
    pub results_scroll: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Data
    pub client: PredictClient,
    pub timeout: Duration,
    pub export_dir: PathBuf,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let client = PredictClient::new(&config.endpoint());
        tracing::info!(endpoint = client.endpoint(), timeout = ?config.timeout(), "dashboard configured");

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: Focus::PastImage,
            dashboard: Dashboard::new(),

            past_path: String::new(),
            recent_path: String::new(),

            submission_task: None,
            cancel_handle: None,

            notice: None,
            result_view: None,
            results_scroll: 0,

            animation_frame: 0,

            client,
            timeout: config.timeout(),
            export_dir: PathBuf::from("canopy-exports"),
        }
    }

    pub fn path_input(&self, slot: Slot) -> &str {
        match slot {
            Slot::Past => &self.past_path,
            Slot::Recent => &self.recent_path,
        }
    }

    pub fn path_input_mut(&mut self, slot: Slot) -> &mut String {
        match slot {
            Slot::Past => &mut self.past_path,
            Slot::Recent => &mut self.recent_path,
        }
    }

    /// Stage the file named in the slot's path field. An empty field unsets the slot.
    pub async fn load_slot(&mut self, slot: Slot) {
        let path = self.path_input(slot).trim().to_string();
        if path.is_empty() {
            self.dashboard.input.set(slot, ImageSelection::Unset);
            return;
        }

        match StagedImage::load(&path).await {
            Ok(image) => {
                if !image.looks_like_image() {
                    tracing::warn!(file = %image.name, "selected file does not look like an image");
                }
                self.dashboard.input.set(slot, ImageSelection::Selected(image));
            }
            Err(e) => {
                tracing::warn!(slot = slot.part_name(), error = %e, "could not stage file");
                self.notice = Some(Notice::error(e.to_string()));
            }
        }
    }

    pub fn clear_slot(&mut self, slot: Slot) {
        self.path_input_mut(slot).clear();
        self.dashboard.input.set(slot, ImageSelection::Unset);
    }

    /// Start a submission in the background. Ignored while one is pending.
    pub fn submit(&mut self) {
        if self.dashboard.is_busy() {
            return;
        }

        match self.dashboard.begin_submit() {
            Ok(request) => {
                let (handle, signal) = cancel_pair();
                let client = self.client.clone();
                let timeout = self.timeout;

                self.result_view = None;
                self.results_scroll = 0;
                self.cancel_handle = Some(handle);
                self.submission_task = Some(tokio::spawn(async move {
                    run_submission(&client, request, timeout, signal).await
                }));
            }
            Err(rejected) => {
                self.notice = Some(Notice::warning(rejected.to_string()));
            }
        }
    }

    pub fn cancel_submission(&mut self) {
        if let Some(handle) = &self.cancel_handle {
            tracing::info!("cancelling pending prediction");
            handle.cancel();
        }
    }

    /// Settle the dashboard once the background request has finished.
    pub async fn poll_submission(&mut self) {
        let finished = self
            .submission_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        let Some(task) = self.submission_task.take() else {
            return;
        };
        self.cancel_handle = None;

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(PredictError::Worker(e.to_string())),
        };

        self.dashboard.settle(outcome);
        self.result_view = view::render(self.dashboard.state());
        if let Some(failure) = self.dashboard.failure() {
            self.notice = Some(match failure.kind {
                FailureKind::Cancelled => Notice::info(failure.user_message()),
                _ => Notice::error(failure.user_message()),
            });
        }
    }

    pub fn export_images(&mut self) {
        let Some(result) = self.dashboard.result() else {
            return;
        };

        self.notice = Some(match export_generated_images(result, &self.export_dir) {
            Ok(paths) if paths.is_empty() => Notice::info("No generated images to export."),
            Ok(paths) => Notice::info(format!(
                "Saved {}",
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                Notice::error(format!("Export failed: {}", e))
            }
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.dashboard.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_results_down(&mut self) {
        self.results_scroll = self.results_scroll.saturating_add(1);
    }

    pub fn scroll_results_up(&mut self) {
        self.results_scroll = self.results_scroll.saturating_sub(1);
    }
}
