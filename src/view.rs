use crate::canvas::{Canvas, Color};
use crate::channels::ChannelStates;
use crate::device::DmfDevice;
use crate::events::EventBus;
use crate::geometry::Electrode;
use std::collections::HashMap;
use strum_macros::{Display, EnumIter};
use tracing::{debug, error};

pub const OFF_COLOR: Color = Color::BLUE;
pub const ON_COLOR: Color = Color::WHITE;
pub const UNASSIGNED_COLOR: Color = Color::RED;
pub const BACKGROUND_COLOR: Color = Color::BLACK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ElectrodeState {
    AllOff,
    AllOn,
    /// Channels disagree. Not drawable yet (reserved for resistive heating).
    Mixed,
    Unassigned,
}

/// Classifies one electrode from the states of its driving channels.
pub fn classify(channels: &[usize], states: &ChannelStates) -> ElectrodeState {
    let Some((&first, rest)) = channels.split_first() else {
        return ElectrodeState::Unassigned;
    };
    let on = states.is_on(first);
    if rest.iter().any(|&c| states.is_on(c) != on) {
        ElectrodeState::Mixed
    } else if on {
        ElectrodeState::AllOn
    } else {
        ElectrodeState::AllOff
    }
}

/// Electrode ids per draw pass, each in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPlan {
    pub off: Vec<usize>,
    pub on: Vec<usize>,
    pub mixed: Vec<usize>,
    pub unassigned: Vec<usize>,
    by_id: HashMap<usize, ElectrodeState>,
}

impl RenderPlan {
    fn insert(&mut self, id: usize, state: ElectrodeState) {
        let pass = match state {
            ElectrodeState::AllOff => &mut self.off,
            ElectrodeState::AllOn => &mut self.on,
            ElectrodeState::Mixed => &mut self.mixed,
            ElectrodeState::Unassigned => &mut self.unassigned,
        };
        pass.push(id);
        self.by_id.insert(id, state);
    }

    pub fn state_of(&self, id: usize) -> Option<ElectrodeState> {
        self.by_id.get(&id).copied()
    }

    pub fn total(&self) -> usize {
        self.off.len() + self.on.len() + self.mixed.len() + self.unassigned.len()
    }
}

pub fn reconcile(device: &DmfDevice, states: &ChannelStates) -> RenderPlan {
    let mut plan = RenderPlan::default();
    for e in device.geometry.electrodes() {
        plan.insert(e.id, classify(&e.channels, states));
    }
    plan
}

/// Pixel-space view of a device: scale, offset and last drawn colours.
#[derive(Debug, Clone)]
pub struct DeviceView {
    /// Pixels per device unit.
    pub scale: f32,
    /// Device-unit translation applied before scaling.
    pub offset: (f32, f32),
    pub overlay_opacity: u8,
    pub electrode_color: HashMap<usize, Color>,
}

impl Default for DeviceView {
    fn default() -> Self {
        Self {
            scale: 10.0,
            offset: (0.0, 0.0),
            overlay_opacity: 30,
            electrode_color: HashMap::new(),
        }
    }
}

impl DeviceView {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    /// Largest uniform scale that fits the device into the widget; the
    /// offset moves the device's top-left corner to the origin.
    pub fn fit_device(&mut self, widget_size: (u32, u32), device: &DmfDevice) {
        let Some(bounds) = device.geometry.bounds() else {
            return;
        };
        let (w, h) = (widget_size.0 as f32, widget_size.1 as f32);
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        self.scale = (w / bounds.width).min(h / bounds.height);
        self.offset = (-bounds.x, -bounds.y);
        self.electrode_color.clear();
        debug!("fit_device: scale={} offset={:?}", self.scale, self.offset);
    }

    /// Device-space coordinates for a pixel position.
    pub fn translate_coords(&self, px: f32, py: f32) -> (f32, f32) {
        (px / self.scale - self.offset.0, py / self.scale - self.offset.1)
    }

    pub fn find_electrode<'a>(&self, device: &'a DmfDevice, px: f32, py: f32) -> Option<&'a Electrode> {
        let shift_x = self.offset.0 * self.scale;
        let shift_y = self.offset.1 * self.scale;
        device
            .geometry
            .hit_test(px - shift_x, py - shift_y, self.scale)
    }

    /// Recolours every electrode from `states` and repaints `canvas`.
    /// Mixed electrodes are reported and left undrawn.
    pub fn update(
        &mut self,
        device: &DmfDevice,
        states: &ChannelStates,
        canvas: &mut dyn Canvas,
        bus: &mut EventBus,
    ) -> RenderPlan {
        let plan = reconcile(device, states);

        for &id in &plan.mixed {
            error!("electrode {}: mixed channel states are not supported yet", id);
            bus.report(format!(
                "Electrode {} has channels in different states (not supported yet).",
                id
            ));
        }

        canvas.clear(BACKGROUND_COLOR);
        let passes = [
            (&plan.off, OFF_COLOR),
            (&plan.on, ON_COLOR),
            (&plan.unassigned, UNASSIGNED_COLOR),
        ];
        for (ids, color) in passes {
            for &id in ids {
                if let Some(e) = device.geometry.electrode(id) {
                    self.electrode_color.insert(id, color);
                    canvas.fill_rect(self.electrode_rect(e), color);
                }
            }
        }
        plan
    }

    fn electrode_rect(&self, e: &Electrode) -> crate::geometry::Rect {
        let mut r = e.rect(self.scale);
        r.x += self.offset.0 * self.scale;
        r.y += self.offset.1 * self.scale;
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_three_channel_scenario() {
        let channels = [3, 4];
        let mut s = ChannelStates::zeros(5);
        assert_eq!(classify(&channels, &s), ElectrodeState::AllOff);
        s.set(3, 1);
        assert_eq!(classify(&channels, &s), ElectrodeState::Mixed);
        s.set(4, 1);
        assert_eq!(classify(&channels, &s), ElectrodeState::AllOn);
    }

    #[test]
    fn test_plan_looks_up_state_by_id() {
        let mut plan = RenderPlan::default();
        plan.insert(7, ElectrodeState::AllOn);
        plan.insert(2, ElectrodeState::Mixed);
        assert_eq!(plan.state_of(7), Some(ElectrodeState::AllOn));
        assert_eq!(plan.state_of(2), Some(ElectrodeState::Mixed));
        assert_eq!(plan.state_of(3), None);
        assert_eq!((plan.on.clone(), plan.mixed.clone()), (vec![7], vec![2]));
    }

    #[test]
    fn test_classify_unassigned() {
        assert_eq!(
            classify(&[], &ChannelStates::zeros(3)),
            ElectrodeState::Unassigned
        );
    }

    #[test]
    fn test_translate_coords_inverts_offset() {
        let view = DeviceView {
            scale: 2.0,
            offset: (-5.0, -5.0),
            ..Default::default()
        };
        assert_eq!(view.translate_coords(0.0, 4.0), (5.0, 7.0));
    }
}
