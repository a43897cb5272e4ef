#![allow(dead_code)] // Not every test binary uses every helper

use microdrop::app::AppContext;
use microdrop::config::AppConfig;
use microdrop::device::DmfDevice;
use microdrop::geometry::{DeviceGeometry, Electrode};
use microdrop::protocol::Protocol;
use std::path::Path;

/// Builder for Electrode to clean up tests
pub struct ElectrodeBuilder {
    electrode: Electrode,
}

impl ElectrodeBuilder {
    pub fn new(id: usize, x: f32, y: f32) -> Self {
        Self {
            electrode: Electrode {
                id,
                x,
                y,
                width: 10.0,
                height: 10.0,
                channels: Vec::new(),
            },
        }
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.electrode.width = width;
        self.electrode.height = height;
        self
    }

    pub fn channels(mut self, channels: &[usize]) -> Self {
        self.electrode.channels = channels.to_vec();
        self
    }

    pub fn build(self) -> Electrode {
        self.electrode
    }
}

/// 2x2 grid of 10x10 electrodes covering (0,0)-(20,20):
///
/// ```text
///  0: ch [0]      1: ch [1, 2]
///  2: ch []       3: ch [2]
/// ```
pub fn grid_device() -> DmfDevice {
    let electrodes = vec![
        ElectrodeBuilder::new(0, 0.0, 0.0).channels(&[0]).build(),
        ElectrodeBuilder::new(1, 10.0, 0.0).channels(&[1, 2]).build(),
        ElectrodeBuilder::new(2, 0.0, 10.0).build(),
        ElectrodeBuilder::new(3, 10.0, 10.0).channels(&[2]).build(),
    ];
    DmfDevice::new(DeviceGeometry::from_electrodes(electrodes).unwrap()).named("grid")
}

/// Context with a 200x200 widget, so `grid_device` fits at scale 10, offset 0.
pub fn test_config(dir: &Path) -> AppConfig {
    AppConfig {
        device_directory: dir.to_path_buf(),
        widget_width: 200,
        widget_height: 200,
        ..Default::default()
    }
}

pub fn test_context(dir: &Path) -> AppContext {
    AppContext::new(test_config(dir), grid_device(), Protocol::new())
}

/// Pixel centre of a grid electrode at scale 10.
pub fn centre_of(electrode: usize) -> (f32, f32) {
    let col = (electrode % 2) as f32;
    let row = (electrode / 2) as f32;
    (col * 100.0 + 50.0, row * 100.0 + 50.0)
}
