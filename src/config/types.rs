use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default = "default_recognition_server")]
    pub server: ServerConfig,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub volume_service: VolumeServiceConfig,
    #[serde(default)]
    pub models: ModelConfig,
}

/// Where the recognition service finds the volume service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeServiceConfig {
    #[serde(default = "default_volume_service_url")]
    pub url: String,
    #[serde(default = "default_volume_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_detection_model")]
    pub detection_model: PathBuf,
    #[serde(default = "default_classification_model")]
    pub classification_model: PathBuf,
    #[serde(default = "default_class_labels")]
    pub class_labels: PathBuf,
    #[serde(default = "default_detection_input_size")]
    pub detection_input_size: u32,
    #[serde(default = "default_classification_resize")]
    pub classification_resize: u32,
    #[serde(default = "default_classification_crop")]
    pub classification_crop: u32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_volume_server")]
    pub server: ServerConfig,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default)]
    pub estimator: EstimatorConfig,
}

/// Command line of the external volume estimator. The scratch image path is
/// passed as `--input_images`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_estimator_program")]
    pub program: String,
    #[serde(default = "default_estimator_args")]
    pub args: Vec<String>,
    #[serde(default = "default_depth_model_architecture")]
    pub depth_model_architecture: PathBuf,
    #[serde(default = "default_depth_model_weights")]
    pub depth_model_weights: PathBuf,
    #[serde(default = "default_segmentation_weights")]
    pub segmentation_weights: PathBuf,
    #[serde(default = "default_fov")]
    pub fov: f64,
    #[serde(default = "default_plate_diameter_prior")]
    pub plate_diameter_prior: f64,
    #[serde(default = "default_plot_results")]
    pub plot_results: bool,
    #[serde(default = "default_estimator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            server: default_recognition_server(),
            max_upload_bytes: default_max_upload_bytes(),
            volume_service: VolumeServiceConfig::default(),
            models: ModelConfig::default(),
        }
    }
}

impl Default for VolumeServiceConfig {
    fn default() -> Self {
        Self {
            url: default_volume_service_url(),
            timeout_secs: default_volume_timeout_secs(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detection_model: default_detection_model(),
            classification_model: default_classification_model(),
            class_labels: default_class_labels(),
            detection_input_size: default_detection_input_size(),
            classification_resize: default_classification_resize(),
            classification_crop: default_classification_crop(),
            confidence_threshold: default_confidence_threshold(),
            intra_threads: default_intra_threads(),
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            server: default_volume_server(),
            max_upload_bytes: default_max_upload_bytes(),
            scratch_dir: default_scratch_dir(),
            allowed_extensions: default_allowed_extensions(),
            estimator: EstimatorConfig::default(),
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            program: default_estimator_program(),
            args: default_estimator_args(),
            depth_model_architecture: default_depth_model_architecture(),
            depth_model_weights: default_depth_model_weights(),
            segmentation_weights: default_segmentation_weights(),
            fov: default_fov(),
            plate_diameter_prior: default_plate_diameter_prior(),
            plot_results: default_plot_results(),
            timeout_secs: default_estimator_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_recognition_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: 8084,
    }
}

fn default_volume_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: 8000,
    }
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_volume_service_url() -> String {
    "http://volume-service:8000/estimate-volume".to_string()
}

fn default_volume_timeout_secs() -> u64 {
    80
}

fn default_detection_model() -> PathBuf {
    PathBuf::from("models/object_detection.onnx")
}

fn default_classification_model() -> PathBuf {
    PathBuf::from("models/classification.onnx")
}

fn default_class_labels() -> PathBuf {
    PathBuf::from("models/classes.json")
}

fn default_detection_input_size() -> u32 {
    640
}

fn default_classification_resize() -> u32 {
    256
}

fn default_classification_crop() -> u32 {
    224
}

fn default_confidence_threshold() -> f32 {
    0.25
}

fn default_intra_threads() -> usize {
    4
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_estimator_program() -> String {
    "python".to_string()
}

fn default_estimator_args() -> Vec<String> {
    vec![
        "-m".to_string(),
        "food_volume_estimation.volume_estimator".to_string(),
    ]
}

fn default_depth_model_architecture() -> PathBuf {
    PathBuf::from("/models/depth_architecture.json")
}

fn default_depth_model_weights() -> PathBuf {
    PathBuf::from("/models/depth_weights.h5")
}

fn default_segmentation_weights() -> PathBuf {
    PathBuf::from("/models/segmentation_weights.h5")
}

fn default_fov() -> f64 {
    70.0
}

fn default_plate_diameter_prior() -> f64 {
    0.20
}

fn default_plot_results() -> bool {
    true
}

fn default_estimator_timeout_secs() -> u64 {
    600
}
