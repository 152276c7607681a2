use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning of a `LodController`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LodConfig {
    /// Length of the quiet window after the last crop change before the layer is updated.
    pub debounce_ms: u64,
    /// At or below this frame rate, the rendered scale is too fine.
    pub min_framerate: f64,
    /// At or above this frame rate, there is room to render a finer scale.
    pub max_framerate: f64,
    /// Adaptation never moves to a level with more voxels than this.
    pub max_rendered_voxels: u64,
}

/// Two 512³ volumes.
pub const DEFAULT_MAX_RENDERED_VOXELS: u64 = 2 * 512 * 512 * 512;

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            min_framerate: 10.0,
            max_framerate: 33.0,
            max_rendered_voxels: DEFAULT_MAX_RENDERED_VOXELS,
        }
    }
}

impl LodConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// True when `fps` is strictly between the two thresholds.
    pub fn is_framerate_acceptable(&self, fps: f64) -> bool {
        self.min_framerate < fps && fps < self.max_framerate
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: LodConfig = serde_json::from_str(r#"{ "debounce_ms": 100 }"#).unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.max_rendered_voxels, 268_435_456);
        assert_eq!(config.min_framerate, 10.0);
    }

    #[test]
    fn framerate_band_is_open() {
        let config = LodConfig::default();

        assert!(!config.is_framerate_acceptable(10.0));
        assert!(config.is_framerate_acceptable(20.0));
        assert!(!config.is_framerate_acceptable(33.0));
    }
}
