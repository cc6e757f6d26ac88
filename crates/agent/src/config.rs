//! Agent configuration

use anyhow::{Context, Result};
use farmeye_lib::alerting::{
    AudibleCue, DebounceThresholds, SilentCue, TerminalBell, DEFAULT_ALERT_LOG_CAPACITY,
};
use farmeye_lib::detection::ClassificationRules;
use farmeye_lib::models::{CameraInfo, CameraKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default config file, read when present
const DEFAULT_CONFIG_FILE: &str = "farmeye.toml";

/// Camera entry in the configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub id: String,

    /// Display name; defaults to the id
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: CameraKind,

    #[serde(default = "default_true")]
    pub active: bool,
}

impl From<CameraConfig> for CameraInfo {
    fn from(camera: CameraConfig) -> Self {
        CameraInfo {
            name: camera.name.unwrap_or_else(|| camera.id.clone()),
            id: camera.id,
            active: camera.active,
            kind: camera.kind,
        }
    }
}

/// Cue played for each alert while sound is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    /// Terminal bell on stderr
    #[default]
    Bell,
    /// No cue, for headless hosts
    Silent,
}

impl CueKind {
    pub fn build(self) -> Arc<dyn AudibleCue> {
        match self {
            CueKind::Bell => Arc::new(TerminalBell),
            CueKind::Silent => Arc::new(SilentCue),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name reported in structured logs
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Cadence of each camera's detection loop
    #[serde(default = "default_detection_interval")]
    pub detection_interval_ms: u64,

    #[serde(default = "default_true")]
    pub detection_enabled: bool,

    /// Initial state of the sound toggle
    #[serde(default = "default_true")]
    pub sound_enabled: bool,

    /// Independent of `sound_enabled`, which can be flipped at runtime
    #[serde(default)]
    pub cue: CueKind,

    /// Detections scoring below this are dropped before classification
    #[serde(default)]
    pub min_confidence: f32,

    #[serde(default = "default_alert_log_capacity")]
    pub alert_log_capacity: usize,

    /// Size of the synthetic frames handed to the detector
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    /// JSON file with scripted detections per camera
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    #[serde(default = "default_feed_low_percent")]
    pub feed_low_percent: u8,

    #[serde(default = "default_feed_delta_percent")]
    pub feed_delta_percent: u8,

    #[serde(default)]
    pub cameras: Vec<CameraConfig>,

    #[serde(default)]
    pub classification: ClassificationRules,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "farm".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_detection_interval() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_alert_log_capacity() -> usize {
    DEFAULT_ALERT_LOG_CAPACITY
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_feed_low_percent() -> u8 {
    DebounceThresholds::default().feed_low_percent
}

fn default_feed_delta_percent() -> u8 {
    DebounceThresholds::default().feed_delta_percent
}

impl AgentConfig {
    /// Load configuration from the config file and environment.
    ///
    /// The file is taken from `FARMEYE_CONFIG`, or `farmeye.toml` in the
    /// working directory if it exists.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("FARMEYE_CONFIG").map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Load configuration from `path` (optional) layered under the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config = builder
            .add_source(
                config::Environment::with_prefix("FARMEYE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: AgentConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.detection_interval_ms == 0 {
            anyhow::bail!("detection_interval_ms must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            anyhow::bail!("min_confidence must be within 0.0..=1.0");
        }
        if self.feed_low_percent > 100 {
            anyhow::bail!("feed_low_percent must be at most 100");
        }
        Ok(())
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    pub fn thresholds(&self) -> DebounceThresholds {
        DebounceThresholds {
            feed_low_percent: self.feed_low_percent,
            feed_delta_percent: self.feed_delta_percent,
        }
    }

    /// Configured cameras; ids appearing twice keep the first entry
    pub fn camera_infos(&self) -> Vec<CameraInfo> {
        let mut seen = std::collections::HashSet::new();
        self.cameras
            .iter()
            .filter(|c| seen.insert(c.id.clone()))
            .cloned()
            .map(CameraInfo::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let file = write_config("");
        let config = AgentConfig::load_from(Some(file.path())).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.detection_interval(), Duration::from_millis(500));
        assert!(config.detection_enabled);
        assert!(config.sound_enabled);
        assert_eq!(config.alert_log_capacity, 50);
        assert_eq!(config.thresholds(), DebounceThresholds::default());
        assert_eq!(config.classification, ClassificationRules::default());
        assert!(config.cameras.is_empty());
        assert!(config.replay_path.is_none());
    }

    #[test]
    fn test_cameras_and_classification_from_file() {
        let file = write_config(
            r#"
node_name = "north-pasture"
detection_interval_ms = 250
min_confidence = 0.4

[[cameras]]
id = "barn"
name = "Barn East"
kind = "ip"

[[cameras]]
id = "gate"
active = false

[[cameras]]
id = "barn"
name = "Duplicate"

[classification]
animal = ["cow", "dog"]
"#,
        );
        let config = AgentConfig::load_from(Some(file.path())).unwrap();

        assert_eq!(config.node_name, "north-pasture");
        assert_eq!(config.detection_interval_ms, 250);
        assert_eq!(config.min_confidence, 0.4);

        let cameras = config.camera_infos();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].name, "Barn East");
        assert_eq!(cameras[0].kind, CameraKind::Ip);
        assert!(cameras[0].active);
        assert_eq!(cameras[1].name, "gate");
        assert!(!cameras[1].active);

        assert!(config.classification.animal.contains("dog"));
        // Lists not given keep their defaults
        assert!(config.classification.intruder.contains("person"));
    }

    #[test]
    fn test_cue_does_not_follow_sound_toggle() {
        let file = write_config("sound_enabled = false");
        let config = AgentConfig::load_from(Some(file.path())).unwrap();
        assert!(!config.sound_enabled);
        // Sound can be switched on later, so the bell must still be installed
        assert_eq!(config.cue, CueKind::Bell);

        let file = write_config("cue = \"silent\"");
        let config = AgentConfig::load_from(Some(file.path())).unwrap();
        assert!(config.sound_enabled);
        assert_eq!(config.cue, CueKind::Silent);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let file = write_config("detection_interval_ms = 0");
        assert!(AgentConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AgentConfig::load_from(Some(&missing)).is_err());
    }
}
