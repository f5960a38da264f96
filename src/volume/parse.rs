/// Marker the estimator prints before its final answer.
pub const VOLUME_MARKER: &str = "Estimated volume:";

/// Reads the volume (ml) from the estimator's stdout.
///
/// Only the last line carrying the marker is considered; if its first token
/// after the marker is not a finite number there is no answer, earlier marker
/// lines are not consulted.
pub fn parse_volume(stdout: &str) -> Option<f64> {
    let line = stdout.lines().rev().find(|line| line.contains(VOLUME_MARKER))?;
    let (_, rest) = line.split_once(VOLUME_MARKER)?;
    let token = rest.split_whitespace().next()?;

    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
