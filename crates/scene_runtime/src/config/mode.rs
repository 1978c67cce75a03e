//! # Mode Parameters
//!
//! The switches a scene run is started with: which scene, which camera, how strictly
//! input is validated, and which debug features are on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Config, ConfigError};

/// Camera name meaning "use the first camera the scene declares"
pub const DEFAULT_CAMERA: &str = "default";

/// How much checking parsing and scene construction perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// Trust the input; malformed files give unspecified (but memory-safe) results
    #[default]
    Fast,
    /// Verify every structural expectation and report the first violation
    Checked,
}

impl ValidationLevel {
    /// Map the classic debug switch and verbosity to a tier.
    /// Only full debugging turns checking on.
    pub const fn from_debug(debug: bool, level: DebugLevel) -> Self {
        if debug && matches!(level, DebugLevel::All) {
            Self::Checked
        } else {
            Self::Fast
        }
    }

    /// Whether checks run at this tier
    pub const fn is_checked(self) -> bool {
        matches!(self, Self::Checked)
    }
}

/// Debug verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum DebugLevel {
    /// No debug output
    #[default]
    None,
    /// Only severe problems
    Severe,
    /// Severe and moderate problems
    Moderate,
    /// Everything
    All,
}

/// Parameters a scene run is started with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeParameters {
    /// Scene file name, resolved through [`ModeParameters::search_dirs`]
    pub scene_name: String,
    /// Name of the CAMERA object to start from, or [`DEFAULT_CAMERA`]
    pub start_camera: String,
    /// Input validation tier
    pub validation: ValidationLevel,
    /// Skip meshes whose bounds fall outside the cull camera's frustum
    pub frustum_culling: bool,
    /// Append bounds wireframe vertices for every mesh
    pub debug_bounds: bool,
    /// Keep culling on the scene camera when the user orbit camera is added
    pub debug_camera: bool,
    /// Directories tried, in order, after the bare path
    pub search_dirs: Vec<PathBuf>,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ModeParameters {
    fn default() -> Self {
        Self {
            scene_name: "scene".to_string(),
            start_camera: DEFAULT_CAMERA.to_string(),
            validation: ValidationLevel::Fast,
            frustum_culling: true,
            debug_bounds: false,
            debug_camera: false,
            search_dirs: vec![PathBuf::from("scenes"), PathBuf::from("scenes/meshes")],
            log_filter: "info".to_string(),
        }
    }
}

impl Config for ModeParameters {}

impl ModeParameters {
    /// Parameters for the given scene with every other field defaulted
    pub fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            ..Default::default()
        }
    }

    /// Start from the named camera
    pub fn with_start_camera(mut self, name: impl Into<String>) -> Self {
        self.start_camera = name.into();
        self
    }

    /// Set the validation tier
    pub fn with_validation(mut self, validation: ValidationLevel) -> Self {
        self.validation = validation;
        self
    }

    /// Enable or disable frustum culling
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culling = enabled;
        self
    }

    /// Enable or disable bounds wireframes
    pub fn with_debug_bounds(mut self, enabled: bool) -> Self {
        self.debug_bounds = enabled;
        self
    }

    /// Enable or disable the detached debug camera
    pub fn with_debug_camera(mut self, enabled: bool) -> Self {
        self.debug_camera = enabled;
        self
    }

    /// Replace the search directories
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Whether the start camera is the "first camera" sentinel
    pub fn wants_default_camera(&self) -> bool {
        self.start_camera == DEFAULT_CAMERA
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scene_name.trim().is_empty() {
            return Err(ConfigError::Invalid("scene name cannot be empty".to_string()));
        }
        if self.start_camera.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "start camera cannot be empty (use \"{DEFAULT_CAMERA}\" for the first camera)"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_only_at_full_debug() {
        assert_eq!(ValidationLevel::from_debug(true, DebugLevel::All), ValidationLevel::Checked);
        assert_eq!(ValidationLevel::from_debug(true, DebugLevel::Moderate), ValidationLevel::Fast);
        assert_eq!(ValidationLevel::from_debug(false, DebugLevel::All), ValidationLevel::Fast);
    }

    #[test]
    fn test_defaults_use_first_camera() {
        let params = ModeParameters::default();
        assert!(params.wants_default_camera());
        assert!(params.frustum_culling);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_scene_name() {
        assert!(ModeParameters::new("  ").validate().is_err());
    }

    #[test]
    fn test_toml_partial_file_fills_defaults() {
        let params: ModeParameters =
            toml::from_str("scene_name = \"sg-Articulation\"\nvalidation = \"Checked\"\n").unwrap();
        assert_eq!(params.scene_name, "sg-Articulation");
        assert!(params.validation.is_checked());
        assert_eq!(params.start_camera, DEFAULT_CAMERA);
    }

    #[test]
    fn test_save_and_load_ron() {
        let path = std::env::temp_dir().join(format!("mode_params_{}.ron", std::process::id()));
        let params = ModeParameters::new("cube").with_start_camera("main").with_debug_bounds(true);
        params.save_to_file(&path).unwrap();
        let loaded = ModeParameters::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = ModeParameters::load_from_file("params.json");
        assert!(err.is_err());
    }
}
