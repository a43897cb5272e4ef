use crate::error::{MdResult, MicrodropError};
use crate::geometry::DeviceGeometry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// File name of the device dump inside a device directory.
pub const DEVICE_FILE: &str = "device";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DmfDevice {
    #[serde(default)]
    pub name: Option<String>,

    /// mm² per device unit², set by calibrating against a known electrode area.
    #[serde(default)]
    pub scale: Option<f64>,

    pub geometry: DeviceGeometry,
}

impl DmfDevice {
    pub fn new(geometry: DeviceGeometry) -> Self {
        Self {
            name: None,
            scale: None,
            geometry,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn max_channel(&self) -> Option<usize> {
        self.geometry.max_channel()
    }

    /// Length a channel-state array needs to cover every assigned channel.
    pub fn channel_count(&self) -> usize {
        self.max_channel().map_or(0, |m| m.saturating_add(1))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> MdResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MicrodropError::NotFound(format!("device file '{}': {}", path.display(), e))
        })?;
        let mut device: DmfDevice = serde_json::from_str(&content)?;
        // Re-validate geometry coming off disk.
        device.geometry =
            DeviceGeometry::from_electrodes(device.geometry.electrodes().to_vec())?;
        info!("📂 Loaded device {:?} ({} electrodes)", device.name, device.geometry.len());
        Ok(device)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> MdResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("💾 Saved device {:?} to {}", self.name, path.display());
        Ok(())
    }
}
