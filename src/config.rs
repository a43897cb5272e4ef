use crate::error::{MdResult, MicrodropError};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root holding one sub-directory per device.
    #[arg(long, default_value = "devices")]
    pub device_directory: PathBuf,

    /// Opacity (percent) of the device drawing over a background image.
    #[arg(long, default_value_t = 30)]
    pub overlay_opacity: u8,

    #[arg(long, default_value_t = 640)]
    pub widget_width: u32,
    #[arg(long, default_value_t = 480)]
    pub widget_height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_directory: PathBuf::from("devices"),
            overlay_opacity: 30,
            widget_width: 640,
            widget_height: 480,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MdResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MicrodropError::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MdResult<()> {
        if !(1..=100).contains(&self.overlay_opacity) {
            return Err(MicrodropError::Config(format!(
                "overlay_opacity must be between 1 and 100 (got {})",
                self.overlay_opacity
            )));
        }
        if self.widget_width == 0 || self.widget_height == 0 {
            return Err(MicrodropError::Config(
                "widget size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn widget_size(&self) -> (u32, u32) {
        (self.widget_width, self.widget_height)
    }

    /// Directory holding the named device's files.
    pub fn device_path(&self, name: &str) -> PathBuf {
        self.device_directory.join(name)
    }

    /// Experiment log root for the named device.
    pub fn log_directory(&self, name: &str) -> PathBuf {
        self.device_path(name).join("logs")
    }

    /// Values typed on the command line win over values from a file.
    pub fn merge_from_cli(&mut self, cli: &AppConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident, $arg_name:expr) => {
                if matches.value_source($arg_name) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(device_directory, "device_directory");
        update_if_present!(overlay_opacity, "overlay_opacity");
        update_if_present!(widget_width, "widget_width");
        update_if_present!(widget_height, "widget_height");
    }
}
