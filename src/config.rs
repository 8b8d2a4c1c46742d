//! Render job configuration.
//!
//! A job is read from an optional JSON file; every key is optional and
//! falls back to the defaults below. Command-line flags are applied on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::input::FilterKey;
use crate::post_processing::PostProcessKind;

fn default_output_dir() -> PathBuf {
    PathBuf::from("render_out")
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> f32 {
    60.0
}

fn default_frames() -> usize {
    120
}

fn default_filter() -> String {
    PostProcessKind::Copy.label().to_string()
}

fn default_ambient_colour() -> [f32; 4] {
    [0.3, 0.3, 0.4, 1.0]
}

fn default_area_effects() -> Vec<AreaEffectConfig> {
    vec![AreaEffectConfig::default()]
}

fn default_pointer() -> [f32; 2] {
    [640.0, 360.0]
}

fn default_save_every() -> usize {
    1
}

fn default_area_effect() -> String {
    PostProcessKind::Spiral.label().to_string()
}

fn default_area_entity() -> String {
    "Cubey".to_string()
}

fn default_area_size() -> f32 {
    20.0
}

fn default_area_depth_offset() -> f32 {
    -9.0
}

/// A post-process drawn over a camera-facing quad around a scene entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaEffectConfig {
    /// Post-process name, e.g. "Spiral" or "Heat Haze".
    #[serde(default = "default_area_effect")]
    pub effect: String,

    /// Entity the area follows.
    #[serde(default = "default_area_entity")]
    pub entity: String,

    /// Quad size in world units.
    #[serde(default = "default_area_size")]
    pub width: f32,
    #[serde(default = "default_area_size")]
    pub height: f32,

    /// Negative values pull the effect towards the camera.
    #[serde(default = "default_area_depth_offset")]
    pub depth_offset: f32,
}

impl Default for AreaEffectConfig {
    fn default() -> Self {
        Self {
            effect: default_area_effect(),
            entity: default_area_entity(),
            width: default_area_size(),
            height: default_area_size(),
            depth_offset: default_area_depth_offset(),
        }
    }
}

/// A simulated filter key press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyActivation {
    /// Frame index the key is pressed on, before that frame's update.
    pub frame: usize,

    /// Digit key, 0..=9.
    pub key: u8,

    /// Pointer position for this press. Falls back to the job's pointer.
    #[serde(default)]
    pub pointer: Option<[f32; 2]>,
}

/// Specification for one offline render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJobSpec {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Simulated frames per second; each tick advances by 1/fps.
    #[serde(default = "default_fps")]
    pub fps: f32,

    #[serde(default = "default_frames")]
    pub frames: usize,

    /// Initial full-screen post-process.
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Clear colour of the scene capture.
    #[serde(default = "default_ambient_colour")]
    pub ambient_colour: [f32; 4],

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default = "default_area_effects")]
    pub area_effects: Vec<AreaEffectConfig>,

    #[serde(default)]
    pub activations: Vec<KeyActivation>,

    /// Pointer position in pixels.
    #[serde(default = "default_pointer")]
    pub pointer: [f32; 2],

    /// Folder holding Noise.png, Burn.png and Distort.png. Procedural maps
    /// are generated when unset.
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    /// Seed for the grey noise offsets.
    #[serde(default)]
    pub seed: u64,

    /// Write every Nth frame.
    #[serde(default = "default_save_every")]
    pub save_every: usize,
}

impl Default for RenderJobSpec {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            frames: default_frames(),
            filter: default_filter(),
            ambient_colour: default_ambient_colour(),
            camera: CameraConfig::default(),
            area_effects: default_area_effects(),
            activations: Vec::new(),
            pointer: default_pointer(),
            media_dir: None,
            seed: 0,
            save_every: default_save_every(),
        }
    }
}

impl RenderJobSpec {
    /// Load a job from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {:?}: {}", path, e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file {:?}: {}", path, e))
    }

    /// Validate the job specification.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("Width and height must be positive".to_string());
        }
        if self.fps <= 0.0 {
            return Err("FPS must be positive".to_string());
        }
        if self.save_every == 0 {
            return Err("saveEvery must be at least 1".to_string());
        }
        self.filter_kind()?;
        for (i, area) in self.area_effects.iter().enumerate() {
            if area.width <= 0.0 || area.height <= 0.0 {
                return Err(format!("Area effect {}: width and height must be positive", i));
            }
            area.effect
                .parse::<PostProcessKind>()
                .map_err(|e| format!("Area effect {}: {}", i, e))?;
        }
        for activation in &self.activations {
            if FilterKey::new(activation.key).is_none() {
                return Err(format!(
                    "Activation at frame {}: key {} is not a digit",
                    activation.frame, activation.key
                ));
            }
        }
        Ok(())
    }

    /// The initial full-screen post-process.
    pub fn filter_kind(&self) -> Result<PostProcessKind, String> {
        self.filter.parse()
    }

    /// Tick length in seconds.
    pub fn frame_duration(&self) -> f32 {
        1.0 / self.fps
    }

    /// Whether `frame` is written to disk.
    pub fn should_save(&self, frame: usize) -> bool {
        frame % self.save_every.max(1) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let spec: RenderJobSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, RenderJobSpec::default());
        assert_eq!(spec.width, 1280);
        assert_eq!(spec.filter_kind(), Ok(PostProcessKind::Copy));
        assert_eq!(spec.area_effects.len(), 1);
        assert_eq!(spec.area_effects[0].entity, "Cubey");
        assert_eq!(spec.area_effects[0].depth_offset, -9.0);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "width": 640,
            "height": 480,
            "filter": "heat haze",
            "areaEffects": [{"effect": "Ripple", "entity": "PostProcessBlock", "width": 8}],
            "activations": [{"frame": 10, "key": 0}, {"frame": 20, "key": 9, "pointer": [10, 20]}],
            "mediaDir": "media",
            "saveEvery": 5
        }"#;
        let spec: RenderJobSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.filter_kind(), Ok(PostProcessKind::HeatHaze));
        assert_eq!(spec.area_effects[0].width, 8.0);
        assert_eq!(spec.area_effects[0].height, 20.0);
        assert_eq!(spec.activations[1].pointer, Some([10.0, 20.0]));
        assert_eq!(spec.media_dir, Some(PathBuf::from("media")));
        assert!(spec.should_save(10));
        assert!(!spec.should_save(11));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut spec = RenderJobSpec::default();
        spec.width = 0;
        assert!(spec.validate().is_err());

        let mut spec = RenderJobSpec::default();
        spec.fps = 0.0;
        assert!(spec.validate().is_err());

        let mut spec = RenderJobSpec::default();
        spec.filter = "Bloom".to_string();
        assert!(spec.validate().unwrap_err().contains("Bloom"));

        let mut spec = RenderJobSpec::default();
        spec.area_effects[0].height = -1.0;
        assert!(spec.validate().is_err());

        let mut spec = RenderJobSpec::default();
        spec.activations.push(KeyActivation { frame: 0, key: 12, pointer: None });
        assert!(spec.validate().is_err());
    }
}
