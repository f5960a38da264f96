use super::parse::parse_volume;
use crate::{Error, Result, config::EstimatorConfig};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Turns an image on disk into a volume in millilitres.
#[async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(&self, image_path: &Path) -> Result<f64>;
}

/// Runs the external estimation program once per image.
pub struct ProcessEstimator {
    config: EstimatorConfig,
    timeout: Duration,
}

impl ProcessEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self { config, timeout }
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("--input_images")
            .arg(image_path)
            .arg("--depth_model_architecture")
            .arg(&self.config.depth_model_architecture)
            .arg("--depth_model_weights")
            .arg(&self.config.depth_model_weights)
            .arg("--segmentation_weights")
            .arg(&self.config.segmentation_weights)
            .arg("--fov")
            .arg(self.config.fov.to_string())
            .arg("--plate_diameter_prior")
            .arg(self.config.plate_diameter_prior.to_string());

        if self.config.plot_results {
            cmd.arg("--plot_results");
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Abandoned futures (timeout, client gone) must not leave the process behind.
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Estimator for ProcessEstimator {
    async fn estimate(&self, image_path: &Path) -> Result<f64> {
        debug!(
            program = %self.config.program,
            image = %image_path.display(),
            "Invoking volume estimator"
        );

        let output = tokio::time::timeout(self.timeout, self.command(image_path).output())
            .await
            .map_err(|_| {
                warn!(
                    image = %image_path.display(),
                    "Volume estimator timed out after {}s", self.config.timeout_secs
                );
                Error::EstimatorFailure(format!(
                    "estimator timed out after {}s",
                    self.config.timeout_secs
                ))
            })?
            .map_err(|e| {
                Error::EstimatorFailure(format!(
                    "failed to launch {}: {}",
                    self.config.program, e
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(
                image = %image_path.display(),
                status = %output.status,
                "Volume estimator failed"
            );
            return Err(Error::EstimatorFailure(stderr));
        }

        let volume_ml = parse_volume(&stdout).ok_or(Error::UnparseableOutput(stdout))?;

        info!(image = %image_path.display(), volume_ml, "Volume estimated");
        Ok(volume_ml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `sh -c <script>` swallows the appended estimator flags as positional args.
    fn shell(script: &str, timeout_secs: u64) -> ProcessEstimator {
        ProcessEstimator::new(EstimatorConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "estimator".to_string()],
            timeout_secs,
            ..Default::default()
        })
    }

    #[test]
    fn test_command_line_layout() {
        let estimator = ProcessEstimator::new(EstimatorConfig::default());
        let cmd = estimator.command(Path::new("/tmp/assets/abc.jpg"));
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "python");
        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-m",
                "food_volume_estimation.volume_estimator",
                "--input_images",
                "/tmp/assets/abc.jpg",
                "--depth_model_architecture",
                "/models/depth_architecture.json",
                "--depth_model_weights",
                "/models/depth_weights.h5",
                "--segmentation_weights",
                "/models/segmentation_weights.h5",
                "--fov",
                "70",
                "--plate_diameter_prior",
                "0.2",
                "--plot_results",
            ]
        );
    }

    #[tokio::test]
    async fn test_parses_marker_line() {
        let estimator = shell("echo 'warming up'; echo 'Estimated volume: 350.5 ml'", 10);
        let volume = estimator.estimate(Path::new("unused.jpg")).await.unwrap();
        assert_eq!(volume, 350.5);
    }

    #[tokio::test]
    async fn test_receives_image_path() {
        // $1 is --input_images, $2 the path.
        let estimator = shell(r#"test -f "$2" && echo "Estimated volume: 7 ml""#, 10);
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("plate.png");
        std::fs::write(&image, b"img").unwrap();

        assert_eq!(estimator.estimate(&image).await.unwrap(), 7.0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_surfaces_stderr() {
        let estimator = shell("echo 'weights missing' >&2; exit 3", 10);
        let err = estimator.estimate(Path::new("x.jpg")).await.unwrap_err();

        match err {
            Error::EstimatorFailure(stderr) => assert!(stderr.contains("weights missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_marker_surfaces_stdout() {
        let estimator = shell("echo 'no plate found'", 10);
        let err = estimator.estimate(Path::new("x.jpg")).await.unwrap_err();

        match err {
            Error::UnparseableOutput(stdout) => assert!(stdout.contains("no plate found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_estimator_failure() {
        let estimator = shell("sleep 5", 1);
        let err = estimator.estimate(Path::new("x.jpg")).await.unwrap_err();

        assert!(matches!(err, Error::EstimatorFailure(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_missing_program_is_estimator_failure() {
        let estimator = ProcessEstimator::new(EstimatorConfig {
            program: "/nonexistent/volume-estimator".to_string(),
            ..Default::default()
        });
        let err = estimator.estimate(Path::new("x.jpg")).await.unwrap_err();

        assert!(matches!(err, Error::EstimatorFailure(msg) if msg.contains("failed to launch")));
    }
}
