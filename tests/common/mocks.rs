use async_trait::async_trait;
use food_vision::{
    Error, Result,
    vision::{BoundingBox, ClassLabels, Classifier, Detection, Detector, Recognizer},
    volume::Estimator,
};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Mock detector returning a fixed detection (or none)
#[derive(Debug, Default)]
pub struct MockDetector {
    pub detection: Option<Detection>,
    pub error: Option<String>,
}

impl MockDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_box(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.detection = Some(Detection {
            bbox: BoundingBox { x1, y1, x2, y2 },
            confidence: 0.92,
        });
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl Detector for MockDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Option<Detection>> {
        if let Some(ref error) = self.error {
            return Err(Error::model(error.clone()));
        }
        Ok(self.detection)
    }
}

/// Mock classifier returning a fixed class index and counting calls
#[derive(Debug, Default)]
pub struct MockClassifier {
    pub class_index: usize,
    pub calls: AtomicUsize,
}

impl MockClassifier {
    pub fn predicting(class_index: usize) -> Self {
        Self {
            class_index,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.class_index)
    }
}

pub fn food_labels() -> Arc<ClassLabels> {
    Arc::new(ClassLabels::new(vec![
        "apple_pie".to_string(),
        "caesar_salad".to_string(),
        "ramen".to_string(),
    ]))
}

pub fn mock_recognizer(detector: MockDetector, classifier: Arc<MockClassifier>) -> Arc<Recognizer> {
    Arc::new(Recognizer::new(Arc::new(detector), classifier, food_labels()))
}

/// Mock estimator that records the scratch paths it was given
#[derive(Debug)]
pub struct MockEstimator {
    pub result: std::result::Result<f64, MockEstimatorFailure>,
    pub paths: Mutex<Vec<PathBuf>>,
}

#[derive(Debug, Clone)]
pub enum MockEstimatorFailure {
    Exit(String),
    Unparseable(String),
}

impl MockEstimator {
    pub fn returning(volume_ml: f64) -> Self {
        Self {
            result: Ok(volume_ml),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: MockEstimatorFailure) -> Self {
        Self {
            result: Err(failure),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn get_paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Estimator for MockEstimator {
    async fn estimate(&self, image_path: &Path) -> Result<f64> {
        assert!(image_path.exists(), "scratch file must exist during estimation");
        self.paths.lock().unwrap().push(image_path.to_path_buf());

        match &self.result {
            Ok(volume) => Ok(*volume),
            Err(MockEstimatorFailure::Exit(stderr)) => Err(Error::EstimatorFailure(stderr.clone())),
            Err(MockEstimatorFailure::Unparseable(stdout)) => {
                Err(Error::UnparseableOutput(stdout.clone()))
            }
        }
    }
}
