//! Input stage: the two image slots staged for submission.
//!
//! Selections are replaced wholesale on every pick; nothing here mutates a
//! staged image in place.

use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Shown in place of a file name when a slot is empty.
pub const NO_FILE_CHOSEN: &str = "No file chosen";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "webp", "gif", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Past,
    Recent,
}

impl Slot {
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Past => "Past Image",
            Slot::Recent => "Recent Image",
        }
    }

    /// Multipart part name expected by the prediction endpoint.
    pub fn part_name(&self) -> &'static str {
        match self {
            Slot::Past => "past_image",
            Slot::Recent => "recent_image",
        }
    }
}

/// A user-chosen file, read into memory but not yet transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub name: String,
    pub path: Option<PathBuf>,
    pub bytes: Vec<u8>,
}

impl StagedImage {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            path: None,
            bytes,
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} does not name a file", path.display()))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow!("Could not read {}: {}", path.display(), e))?;

        tracing::debug!(file = %path.display(), size = bytes.len(), "staged image");

        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            bytes,
        })
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Advisory only: the service decides whether it can read the file.
    pub fn looks_like_image(&self) -> bool {
        self.extension()
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("tif") | Some("tiff") => "image/tiff",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageSelection {
    #[default]
    Unset,
    Selected(StagedImage),
}

impl ImageSelection {
    pub fn staged(&self) -> Option<&StagedImage> {
        match self {
            ImageSelection::Unset => None,
            ImageSelection::Selected(image) => Some(image),
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ImageSelection::Selected(_))
    }

    pub fn display_name(&self) -> &str {
        self.staged()
            .map(|image| image.name.as_str())
            .unwrap_or(NO_FILE_CHOSEN)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputStage {
    past: ImageSelection,
    recent: ImageSelection,
}

impl InputStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_past(&mut self, selection: ImageSelection) {
        self.set(Slot::Past, selection);
    }

    pub fn set_recent(&mut self, selection: ImageSelection) {
        self.set(Slot::Recent, selection);
    }

    pub fn set(&mut self, slot: Slot, selection: ImageSelection) {
        tracing::info!(slot = slot.part_name(), file = selection.display_name(), "selection changed");
        match slot {
            Slot::Past => self.past = selection,
            Slot::Recent => self.recent = selection,
        }
    }

    pub fn get(&self, slot: Slot) -> &ImageSelection {
        match slot {
            Slot::Past => &self.past,
            Slot::Recent => &self.recent,
        }
    }

    pub fn past(&self) -> &ImageSelection {
        &self.past
    }

    pub fn recent(&self) -> &ImageSelection {
        &self.recent
    }

    pub fn display_name(&self, slot: Slot) -> &str {
        self.get(slot).display_name()
    }

    /// Both staged images, or `None` if either slot is empty.
    pub fn both(&self) -> Option<(&StagedImage, &StagedImage)> {
        Some((self.past.staged()?, self.recent.staged()?))
    }
}
