use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::prediction::PredictionResult;
use crate::view::decode_png;

/// Writes the generated PNGs of `result` into `dir`. Absent payloads are skipped.
pub fn export_generated_images(result: &PredictionResult, dir: &Path) -> Result<Vec<PathBuf>> {
    let payloads = [
        ("generated_past.png", result.generated_past_payload()),
        ("generated_recent.png", result.generated_recent_payload()),
    ];

    if payloads.iter().all(|(_, payload)| payload.is_none()) {
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;

    let mut written = Vec::new();
    for (file_name, payload) in payloads {
        let Some(payload) = payload else { continue };
        let png = decode_png(payload).map_err(|e| anyhow!("{}: {}", file_name, e))?;
        let path = dir.join(file_name);
        fs::write(&path, png).with_context(|| format!("Could not write {}", path.display()))?;
        tracing::info!(file = %path.display(), "exported generated image");
        written.push(path);
    }

    Ok(written)
}
