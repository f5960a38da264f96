//! Local food recognition: detect the dish, crop it, classify the crop.
//!
//! The detector and classifier are capabilities behind traits so the ONNX
//! models can be swapped for any other backend (or a fake in tests).

mod labels;
mod onnx;
pub mod preprocess;

pub use labels::ClassLabels;
pub use onnx::{OnnxClassifier, OnnxDetector};

use crate::{Error, Result, config::ModelConfig};
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info};

pub const UNKNOWN_LABEL: &str = "unknown";

/// Axis-aligned box in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Integer crop rectangle `(x, y, width, height)` clamped to the image.
    /// `None` when nothing of the box is left inside the image.
    pub fn crop_rect(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x1.max(0.0).min(width as f32) as u32;
        let y1 = self.y1.max(0.0).min(height as f32) as u32;
        let x2 = self.x2.max(0.0).min(width as f32) as u32;
        let y2 = self.y2.max(0.0).min(height as f32) as u32;

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Finds the single most confident object of interest.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Option<Detection>>;
}

/// Assigns a class index to a cropped region.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Unknown,
    Food(String),
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => UNKNOWN_LABEL,
            Self::Food(name) => name,
        }
    }
}

/// Detect -> crop -> classify pipeline. Built once at startup and shared
/// read-only across requests.
pub struct Recognizer {
    detector: Arc<dyn Detector>,
    classifier: Arc<dyn Classifier>,
    labels: Arc<ClassLabels>,
}

impl Recognizer {
    pub fn new(
        detector: Arc<dyn Detector>,
        classifier: Arc<dyn Classifier>,
        labels: Arc<ClassLabels>,
    ) -> Self {
        Self {
            detector,
            classifier,
            labels,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let labels = ClassLabels::from_file(&config.class_labels)?;
        let detector = OnnxDetector::new(config)?;
        let classifier = OnnxClassifier::new(config)?;

        info!(
            classes = labels.len(),
            "Recognition models loaded successfully"
        );

        Ok(Self::new(
            Arc::new(detector),
            Arc::new(classifier),
            Arc::new(labels),
        ))
    }

    pub fn recognize(&self, image_bytes: &[u8]) -> Result<Label> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| Error::invalid_input(format!("Failed to decode image: {}", e)))?;

        let Some(detection) = self.detector.detect(&image)? else {
            debug!("No object detected");
            return Ok(Label::Unknown);
        };

        let Some((x, y, w, h)) = detection.bbox.crop_rect(image.width(), image.height()) else {
            debug!(bbox = ?detection.bbox, "Detection collapsed after clamping");
            return Ok(Label::Unknown);
        };

        debug!(
            x, y, w, h,
            confidence = detection.confidence,
            "Cropping to top detection"
        );

        let crop = image.crop_imm(x, y, w, h);
        let class_index = self.classifier.classify(&crop)?;
        let name = self.labels.name(class_index)?;

        Ok(Label::Food(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::Mutex;

    struct FixedDetector(Option<Detection>);

    impl Detector for FixedDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Option<Detection>> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingClassifier {
        class_index: usize,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl Classifier for RecordingClassifier {
        fn classify(&self, image: &DynamicImage) -> Result<usize> {
            self.seen
                .lock()
                .unwrap()
                .push((image.width(), image.height()));
            Ok(self.class_index)
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 90, 30]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn labels() -> Arc<ClassLabels> {
        Arc::new(ClassLabels::new(vec![
            "apple_pie".to_string(),
            "sushi".to_string(),
        ]))
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            bbox: BoundingBox { x1, y1, x2, y2 },
            confidence: 0.9,
        }
    }

    #[test]
    fn test_crop_rect_clamps_to_image() {
        let bbox = BoundingBox {
            x1: -5.0,
            y1: 10.0,
            x2: 120.0,
            y2: 40.5,
        };
        assert_eq!(bbox.crop_rect(100, 50), Some((0, 10, 100, 30)));
    }

    #[test]
    fn test_crop_rect_rejects_degenerate_box() {
        let bbox = BoundingBox {
            x1: 200.0,
            y1: 0.0,
            x2: 300.0,
            y2: 10.0,
        };
        assert_eq!(bbox.crop_rect(100, 50), None);
    }

    #[test]
    fn test_recognize_classifies_cropped_region() {
        let classifier = Arc::new(RecordingClassifier {
            class_index: 1,
            ..Default::default()
        });
        let recognizer = Recognizer::new(
            Arc::new(FixedDetector(Some(detection(4.0, 2.0, 24.0, 12.0)))),
            classifier.clone(),
            labels(),
        );

        let label = recognizer.recognize(&png(32, 16)).unwrap();

        assert_eq!(label, Label::Food("sushi".to_string()));
        assert_eq!(*classifier.seen.lock().unwrap(), vec![(20, 10)]);
    }

    #[test]
    fn test_recognize_without_detection_skips_classifier() {
        let classifier = Arc::new(RecordingClassifier::default());
        let recognizer = Recognizer::new(
            Arc::new(FixedDetector(None)),
            classifier.clone(),
            labels(),
        );

        let label = recognizer.recognize(&png(8, 8)).unwrap();

        assert_eq!(label, Label::Unknown);
        assert_eq!(label.as_str(), "unknown");
        assert!(classifier.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recognize_rejects_undecodable_bytes() {
        let recognizer = Recognizer::new(
            Arc::new(FixedDetector(None)),
            Arc::new(RecordingClassifier::default()),
            labels(),
        );

        let err = recognizer.recognize(b"definitely not a png").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_recognize_unknown_class_index_is_internal() {
        let recognizer = Recognizer::new(
            Arc::new(FixedDetector(Some(detection(0.0, 0.0, 8.0, 8.0)))),
            Arc::new(RecordingClassifier {
                class_index: 7,
                ..Default::default()
            }),
            labels(),
        );

        let err = recognizer.recognize(&png(8, 8)).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
