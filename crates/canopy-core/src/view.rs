//! Read-only projection of the submission state into what the dashboard shows.
//!
//! Everything here is a pure function of the current [`SubmissionState`].

use base64::Engine as _;
use image::ImageFormat;

use crate::prediction::PredictionResult;
use crate::submission::SubmissionState;

/// Shown for absent fields, so "missing" never reads as zero.
pub const NOT_AVAILABLE: &str = "N/A";

pub const PAST_IMAGE_TITLE: &str = "Generated Optical (Past)";
pub const RECENT_IMAGE_TITLE: &str = "Generated Optical (Recent)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Raster {
    /// RGBA of pixel (x, y); coordinates are clamped to the image.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0, 0];
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let idx = (y * self.width as usize + x) * 4;
        match self.rgba.get(idx..idx + 4) {
            Some(px) => [px[0], px[1], px[2], px[3]],
            None => [0, 0, 0, 0],
        }
    }
}

/// One generated image section. A payload that will not decode keeps its
/// block and carries the reason instead of pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub title: &'static str,
    pub raster: Result<Raster, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    /// NDVI Past, NDVI Recent, Change, Status, in that order.
    pub metrics: Vec<MetricRow>,
    /// Past block before recent block; absent payloads are omitted.
    pub images: Vec<ImageBlock>,
}

impl ResultView {
    pub fn metric(&self, label: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }
}

/// Three decimals, exact ties rounded away from zero (`0.0625` -> `0.063`).
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", round_ties_away(v)),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn round_ties_away(v: f64) -> f64 {
    // A double lies exactly halfway between two thousandths only when it is an
    // odd multiple of 1/16; `{:.3}` would send those to the even neighbour.
    let sixteenths = v * 16.0;
    if sixteenths.fract() == 0.0 && sixteenths % 2.0 != 0.0 {
        (v * 1000.0).round() / 1000.0
    } else {
        v
    }
}

/// Result section for the current state; `None` unless the last attempt succeeded.
pub fn render(state: &SubmissionState) -> Option<ResultView> {
    state.result().map(project)
}

pub fn project(result: &PredictionResult) -> ResultView {
    let metrics = vec![
        MetricRow {
            label: "NDVI Past",
            value: format_metric(result.ndvi_past),
        },
        MetricRow {
            label: "NDVI Recent",
            value: format_metric(result.ndvi_recent),
        },
        MetricRow {
            label: "Change",
            value: format_metric(result.deforestation_change),
        },
        MetricRow {
            label: "Status",
            value: result
                .status_text()
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
        },
    ];

    let images = [
        (PAST_IMAGE_TITLE, result.generated_past_payload()),
        (RECENT_IMAGE_TITLE, result.generated_recent_payload()),
    ]
    .into_iter()
    .filter_map(|(title, payload)| {
        payload.map(|payload| ImageBlock {
            title,
            raster: decode_raster(payload),
        })
    })
    .collect();

    ResultView { metrics, images }
}

/// Base64 payload to raw PNG bytes. Tolerates a `data:image/png;base64,` prefix.
pub fn decode_png(payload: &str) -> Result<Vec<u8>, String> {
    let payload = payload.trim();
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| format!("invalid base64: {}", e))
}

pub fn decode_raster(payload: &str) -> Result<Raster, String> {
    let png = decode_png(payload)?;
    let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
        .map_err(|e| format!("invalid PNG: {}", e))?
        .to_rgba8();

    Ok(Raster {
        width: decoded.width(),
        height: decoded.height(),
        rgba: decoded.into_raw(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::submission::{FailureKind, Settlement, SubmissionFailure};
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Base64 PNG, 2x1: red then green.
    pub(crate) fn tiny_png_base64() -> String {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
    }

    fn scenario() -> PredictionResult {
        PredictionResult {
            ndvi_past: Some(0.512345),
            ndvi_recent: Some(0.321),
            deforestation_change: Some(-0.191345),
            status: Some("Deforestation Detected".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_metrics() {
        let view = project(&scenario());
        assert_eq!(view.metric("NDVI Past"), Some("0.512"));
        assert_eq!(view.metric("NDVI Recent"), Some("0.321"));
        assert_eq!(view.metric("Change"), Some("-0.191"));
        assert_eq!(view.metric("Status"), Some("Deforestation Detected"));
        assert!(view.images.is_empty());
    }

    #[test]
    fn test_halfway_metrics_round_away_from_zero() {
        assert_eq!(format_metric(Some(0.0625)), "0.063");
        assert_eq!(format_metric(Some(-0.0625)), "-0.063");
        assert_eq!(format_metric(Some(0.1875)), "0.188");
        assert_eq!(format_metric(Some(0.5)), "0.500");
        assert_eq!(format_metric(Some(0.1234)), "0.123");
    }

    #[test]
    fn test_metric_order_is_fixed() {
        let labels: Vec<_> = project(&scenario()).metrics.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["NDVI Past", "NDVI Recent", "Change", "Status"]);
    }

    #[test]
    fn test_absent_fields_show_placeholder_not_zero() {
        let view = project(&PredictionResult::default());
        for row in &view.metrics {
            assert_eq!(row.value, NOT_AVAILABLE, "{}", row.label);
        }
    }

    #[test]
    fn test_zero_is_shown_as_zero() {
        let result = PredictionResult {
            deforestation_change: Some(0.0),
            ..Default::default()
        };
        assert_eq!(project(&result).metric("Change"), Some("0.000"));
    }

    #[test]
    fn test_empty_status_shows_placeholder() {
        let result = PredictionResult {
            status: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(project(&result).metric("Status"), Some(NOT_AVAILABLE));
    }

    #[test]
    fn test_image_blocks_follow_payloads() {
        let png = tiny_png_base64();

        let only_recent = PredictionResult {
            generated_recent: Some(png.clone()),
            ..Default::default()
        };
        let view = project(&only_recent);
        assert_eq!(view.images.len(), 1);
        assert_eq!(view.images[0].title, RECENT_IMAGE_TITLE);

        let both = PredictionResult {
            generated_past: Some(png.clone()),
            generated_recent: Some(png),
            ..Default::default()
        };
        let titles: Vec<_> = project(&both).images.iter().map(|b| b.title).collect();
        assert_eq!(titles, vec![PAST_IMAGE_TITLE, RECENT_IMAGE_TITLE]);
    }

    #[test]
    fn test_raster_is_decoded() {
        let raster = decode_raster(&tiny_png_base64()).unwrap();
        assert_eq!((raster.width, raster.height), (2, 1));
        assert_eq!(raster.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(raster.pixel(1, 0), [0, 255, 0, 255]);
        // clamped
        assert_eq!(raster.pixel(9, 9), [0, 255, 0, 255]);
    }

    #[test]
    fn test_data_url_prefix_is_accepted() {
        let payload = format!("data:image/png;base64,{}", tiny_png_base64());
        assert!(decode_raster(&payload).is_ok());
    }

    #[test]
    fn test_bad_payload_keeps_block_with_error() {
        let result = PredictionResult {
            generated_past: Some("!!not base64!!".to_string()),
            ..Default::default()
        };
        let view = project(&result);
        assert_eq!(view.images.len(), 1);
        assert!(view.images[0].raster.as_ref().unwrap_err().starts_with("invalid base64"));

        let not_png = base64::engine::general_purpose::STANDARD.encode(b"plain text");
        assert!(decode_raster(&not_png).unwrap_err().starts_with("invalid PNG"));
    }

    #[test]
    fn test_render_only_for_success() {
        assert!(render(&SubmissionState::Idle).is_none());
        assert!(render(&SubmissionState::Pending).is_none());

        let failed = SubmissionState::Settled(Settlement::Failed(SubmissionFailure {
            kind: FailureKind::Protocol,
            status: Some(500),
            detail: "HTTP 500".to_string(),
        }));
        assert!(render(&failed).is_none());

        let succeeded = SubmissionState::Settled(Settlement::Succeeded(scenario()));
        assert_eq!(render(&succeeded).unwrap().metric("Change"), Some("-0.191"));
    }
}
