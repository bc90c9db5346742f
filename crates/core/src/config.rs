//! Layout and palette settings.
//!
//! Every field has a default, so a config file only needs to list what it
//! changes:
//!
//! ```json
//! { "layout": { "width": 1920.0 }, "palette": { "entry_package": "app" } }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Palette;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width the root categories are spread over. The default of 1.0 makes
    /// offsets and widths fractions of the whole graph.
    pub width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { width: 1.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub palette: Palette,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.layout.width;
        if !width.is_finite() || width <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "layout width must be positive, got {width}"
            )));
        }
        let step = self.palette.hue_step;
        if !(step > 0.0 && step <= 360.0 && (360.0 / step).fract() == 0.0) {
            return Err(ConfigError::Invalid(format!(
                "hue step must divide 360, got {step}"
            )));
        }
        let [min, max] = self.palette.sibling_lightness;
        if min > max {
            return Err(ConfigError::Invalid(format!(
                "sibling lightness range is inverted: [{min}, {max}]"
            )));
        }
        if self.palette.entry_package.is_empty() {
            return Err(ConfigError::Invalid("entry package is empty".to_string()));
        }
        Ok(())
    }
}
