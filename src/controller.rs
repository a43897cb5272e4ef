// Device canvas controller: pointer handling, channel/area edits and
// device file management. Every function takes the application context
// explicitly and notifies the bus only after its mutation is complete.

use crate::app::AppContext;
use crate::channels::MAX_CHANNEL;
use crate::device::{DmfDevice, DEVICE_FILE};
use crate::error::{MdResult, MicrodropError};
use crate::events::AppEvent;
use crate::protocol::DeviceOptions;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const DEVICE_PLUGIN: &str = "microdrop.gui.dmf_device_controller";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
    Other(u8),
}

impl From<u8> for MouseButton {
    fn from(b: u8) -> Self {
        match b {
            1 => Self::Primary,
            2 => Self::Middle,
            3 => Self::Secondary,
            n => Self::Other(n),
        }
    }
}

/// Pointer press in widget pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub button: MouseButton,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32, button: impl Into<MouseButton>) -> Self {
        Self {
            x,
            y,
            button: button.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing under the pointer.
    Miss,
    /// Channels of `electrode` flipped; `(channel, new level)` pairs.
    Toggled {
        electrode: usize,
        channels: Vec<(usize, u8)>,
    },
    /// Primary click on an electrode without channels.
    NoChannels { electrode: usize },
    MenuRequested { electrode: usize },
    Ignored { electrode: usize },
}

/// Device options for the current step, created (all off) when missing and
/// grown to cover every channel the device references.
pub fn get_step_options(ctx: &mut AppContext) -> &mut DeviceOptions {
    let count = ctx.device.channel_count();
    let step = ctx.protocol.current_step_mut();
    let options = step
        .device_options
        .get_or_insert_with(|| DeviceOptions::with_channel_count(count));
    options.state_of_channels.grow_to(count);
    options
}

pub fn notify_step_options_changed(ctx: &mut AppContext) {
    let step = ctx.protocol.current_step_number();
    ctx.bus.emit(AppEvent::StepOptionsChanged {
        plugin: DEVICE_PLUGIN.to_string(),
        step,
    });
}

pub fn on_button_press(ctx: &mut AppContext, event: PointerEvent) -> ClickOutcome {
    let Some(electrode) = ctx.view.find_electrode(&ctx.device, event.x, event.y) else {
        return ClickOutcome::Miss;
    };
    let id = electrode.id;
    let channels = electrode.channels.clone();
    ctx.last_electrode_clicked = Some(id);

    match event.button {
        MouseButton::Primary => {
            if channels.is_empty() {
                error!("no channel assigned to electrode {}", id);
                ctx.bus
                    .report(format!("No channel assigned to electrode {}.", id));
                return ClickOutcome::NoChannels { electrode: id };
            }
            let state = &mut get_step_options(ctx).state_of_channels;
            let flipped = channels.iter().map(|&c| (c, state.toggle(c))).collect();
            notify_step_options_changed(ctx);
            ClickOutcome::Toggled {
                electrode: id,
                channels: flipped,
            }
        }
        MouseButton::Secondary => {
            ctx.bus.emit(AppEvent::MenuRequested {
                electrode: Some(id),
            });
            ClickOutcome::MenuRequested { electrode: id }
        }
        _ => ClickOutcome::Ignored { electrode: id },
    }
}

/// Keyboard input on the device canvas is not handled.
pub fn on_key_press(_ctx: &mut AppContext, _key: &str) -> bool {
    false
}

// === CHANNEL EDITS ===

/// Parses `"1, 2,3"`. Blank input means no channels; ids above
/// `MAX_CHANNEL` are invalid.
pub fn parse_channel_list(text: &str) -> MdResult<Vec<usize>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|tok| {
            tok.trim()
                .parse::<usize>()
                .ok()
                .filter(|&c| c <= MAX_CHANNEL)
                .ok_or_else(|| MicrodropError::validation("Invalid channel."))
        })
        .collect()
}

pub fn electrode_channels_text(ctx: &AppContext, electrode_id: usize) -> Option<String> {
    ctx.device.geometry.electrode(electrode_id).map(|e| {
        e.channels
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    })
}

pub fn edit_electrode_channels(
    ctx: &mut AppContext,
    electrode_id: usize,
    text: &str,
) -> MdResult<Vec<usize>> {
    if ctx.device.geometry.electrode(electrode_id).is_none() {
        return Err(MicrodropError::NotFound(format!("electrode {}", electrode_id)));
    }
    let channels = match parse_channel_list(text) {
        Ok(c) => c,
        Err(e) => {
            warn!("rejected channel list {:?} for electrode {}", text, electrode_id);
            ctx.bus.report(e.to_string());
            return Err(e);
        }
    };

    // Every step keeps its own state array; all of them must stay index-safe.
    if let Some(&max) = channels.iter().max() {
        for step in ctx.protocol.steps_mut() {
            if let Some(options) = step.device_options.as_mut() {
                options.state_of_channels.grow_to(max + 1);
            }
        }
    }

    if let Some(e) = ctx.device.geometry.electrode_mut(electrode_id) {
        e.channels = channels.clone();
    }
    get_step_options(ctx);
    info!("electrode {} -> channels {:?}", electrode_id, channels);
    notify_step_options_changed(ctx);
    Ok(channels)
}

pub fn edit_last_electrode_channels(ctx: &mut AppContext, text: &str) -> MdResult<Vec<usize>> {
    let id = ctx
        .last_electrode_clicked
        .ok_or_else(|| MicrodropError::validation("No electrode selected."))?;
    edit_electrode_channels(ctx, id, text)
}

// === AREA CALIBRATION ===

/// Calibrated area of an electrode in mm², or empty if the device has no scale.
pub fn electrode_area_text(ctx: &AppContext, electrode_id: usize) -> String {
    match (ctx.device.scale, ctx.device.geometry.electrode(electrode_id)) {
        (Some(scale), Some(e)) => format!("{}", e.area() as f64 * scale),
        _ => String::new(),
    }
}

/// Sets the device scale so `electrode_id` measures `text` mm².
/// Blank input leaves the scale alone.
pub fn edit_electrode_area(
    ctx: &mut AppContext,
    electrode_id: usize,
    text: &str,
) -> MdResult<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(ctx.device.scale);
    }
    let unit_area = ctx
        .device
        .geometry
        .electrode(electrode_id)
        .ok_or_else(|| MicrodropError::NotFound(format!("electrode {}", electrode_id)))?
        .area() as f64;

    let area = match text.parse::<f64>() {
        Ok(a) if a.is_finite() && a > 0.0 => a,
        _ => {
            let e = MicrodropError::validation("Area value is invalid.");
            ctx.bus.report(e.to_string());
            return Err(e);
        }
    };
    let scale = area / unit_area;
    ctx.device.scale = Some(scale);
    info!("device scale set to {} mm² per unit²", scale);
    Ok(Some(scale))
}

// === DEVICE FILES ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
    /// Save under the current name.
    Save,
    /// Save a copy under a new name; the old directory is left alone.
    SaveAs(String),
    /// Move the device directory to a new name.
    Rename(String),
}

/// Writes `<device_directory>/<name>/device`. Returns the directory written,
/// or `None` when a rename turned out to be a no-op.
pub fn save_device(ctx: &mut AppContext, mode: SaveMode) -> MdResult<Option<PathBuf>> {
    let (name, rename) = match mode {
        SaveMode::Save => (ctx.device.name.clone(), false),
        SaveMode::SaveAs(n) => (Some(n), false),
        SaveMode::Rename(n) => (Some(n), true),
    };
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| MicrodropError::validation("The device needs a name before saving."))?;

    let dest = ctx.config.device_path(&name);

    if rename {
        if let Some(old) = ctx.device.name.clone() {
            let src = ctx.config.device_path(&old);
            if src.is_dir() {
                if src == dest {
                    return Ok(None);
                }
                if dest.is_dir() {
                    let e = MicrodropError::validation("A device with that name already exists.");
                    ctx.bus.report(e.to_string());
                    return Err(e);
                }
                fs::rename(&src, &dest)?;
                info!("📁 Moved {} -> {}", src.display(), dest.display());
            }
        }
    }

    fs::create_dir_all(&dest)?;

    if ctx.device.name.as_deref() != Some(name.as_str()) {
        ctx.device.name = Some(name.clone());
        ctx.bus.emit(AppEvent::DeviceChanged {
            name: Some(name.clone()),
        });
    }

    ctx.device.save(dest.join(DEVICE_FILE))?;
    Ok(Some(dest))
}

/// Replaces the context's device with the one stored at `path`.
pub fn load_device<P: AsRef<Path>>(ctx: &mut AppContext, path: P) -> MdResult<()> {
    let device = DmfDevice::load(path)?;
    let name = device.name.clone();
    ctx.device = device;
    ctx.last_electrode_clicked = None;
    get_step_options(ctx);
    ctx.bus.emit(AppEvent::DeviceChanged { name });
    Ok(())
}
