//! ONNX Runtime backed detector and classifier.

use super::{BoundingBox, Classifier, Detection, Detector, preprocess};
use crate::{Error, Result, config::ModelConfig};
use image::DynamicImage;
use ndarray::{Array4, ArrayViewD, Axis, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

fn load_session(model_path: &Path, intra_threads: usize) -> Result<(Session, String)> {
    if !model_path.exists() {
        return Err(Error::config(format!(
            "Model not found: {}",
            model_path.display()
        )));
    }

    info!("Loading model from {}", model_path.display());

    let session = Session::builder()
        .map_err(|e| Error::model(format!("Failed to create session builder: {}", e)))?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .map_err(|e| Error::model(format!("Failed to set CPU execution provider: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::model(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(intra_threads)
        .map_err(|e| Error::model(format!("Failed to set intra threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| {
            Error::model(format!(
                "Failed to load model from {}: {}",
                model_path.display(),
                e
            ))
        })?;

    let input_name = session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .ok_or_else(|| Error::model(format!("{} declares no inputs", model_path.display())))?;

    debug!("Model {} input: {}", model_path.display(), input_name);

    Ok((session, input_name))
}

fn run_session<F, T>(
    session: &Mutex<Session>,
    input_name: &str,
    input: Array4<f32>,
    read: F,
) -> Result<T>
where
    F: FnOnce(ArrayViewD<'_, f32>) -> Result<T>,
{
    let input_value = Value::from_array(input)
        .map_err(|e| Error::model(format!("Failed to create input tensor: {}", e)))?;

    let mut session = session
        .lock()
        .map_err(|_| Error::model("Inference session lock poisoned"))?;

    let outputs = session
        .run(ort::inputs![input_name => input_value])
        .map_err(|e| Error::model(format!("Inference failed: {}", e)))?;

    let output = outputs[0]
        .try_extract_array::<f32>()
        .map_err(|e| Error::model(format!("Failed to extract output tensor: {}", e)))?;

    read(output)
}

/// YOLO-style detector exported to ONNX, output `[1, 4 + classes, anchors]`
/// with boxes as centre x/y, width, height in input pixels.
pub struct OnnxDetector {
    session: Mutex<Session>,
    input_name: String,
    input_size: u32,
    confidence_threshold: f32,
}

impl OnnxDetector {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let (session, input_name) = load_session(&config.detection_model, config.intra_threads)?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size: config.detection_input_size,
            confidence_threshold: config.confidence_threshold.clamp(0.0, 1.0),
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Option<Detection>> {
        let input = preprocess::detection_tensor(image, self.input_size);
        let scale_x = image.width() as f32 / self.input_size as f32;
        let scale_y = image.height() as f32 / self.input_size as f32;

        run_session(&self.session, &self.input_name, input, |output| {
            decode_detections(output, self.confidence_threshold, scale_x, scale_y)
        })
    }
}

/// Picks the highest scoring anchor above `threshold` and maps its box back to
/// source pixels. Accepts both `[1, C, N]` and transposed `[1, N, C]` layouts.
pub(crate) fn decode_detections(
    output: ArrayViewD<'_, f32>,
    threshold: f32,
    scale_x: f32,
    scale_y: f32,
) -> Result<Option<Detection>> {
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|_| Error::model("Unexpected detector output rank"))?;
    let (_, rows, cols) = output.dim();

    // Anchors always outnumber attributes.
    let predictions = if rows <= cols {
        output.index_axis_move(Axis(0), 0)
    } else {
        output.index_axis_move(Axis(0), 0).reversed_axes()
    };

    if predictions.nrows() < 5 {
        return Err(Error::model(format!(
            "Detector output has {} attributes, expected at least 5",
            predictions.nrows()
        )));
    }

    let mut best: Option<Detection> = None;
    for anchor in predictions.axis_iter(Axis(1)) {
        let score = anchor
            .iter()
            .skip(4)
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        if score < threshold || best.is_some_and(|b| b.confidence >= score) {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        best = Some(Detection {
            bbox: BoundingBox {
                x1: (cx - w / 2.0) * scale_x,
                y1: (cy - h / 2.0) * scale_y,
                x2: (cx + w / 2.0) * scale_x,
                y2: (cy + h / 2.0) * scale_y,
            },
            confidence: score,
        });
    }

    Ok(best)
}

/// Image classifier returning logits `[1, classes]`.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    resize: u32,
    crop: u32,
}

impl OnnxClassifier {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let (session, input_name) =
            load_session(&config.classification_model, config.intra_threads)?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            resize: config.classification_resize,
            crop: config.classification_crop,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<usize> {
        let input = preprocess::classification_tensor(image, self.resize, self.crop);

        run_session(&self.session, &self.input_name, input, |output| {
            argmax(output.iter().copied())
                .ok_or_else(|| Error::model("Classifier returned an empty output"))
        })
    }
}

fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
