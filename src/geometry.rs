use crate::channels::MAX_CHANNEL;
use crate::error::{MdResult, MicrodropError};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in whatever space the caller is working in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Open interval test: points on an edge are outside.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px > self.x && px < self.right() && py > self.y && py < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrode {
    pub id: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    #[serde(default)]
    pub channels: Vec<usize>,
}

impl Electrode {
    /// Builds an electrode; a missing `height` makes it square.
    pub fn new(id: usize, x: f32, y: f32, width: f32, height: Option<f32>) -> MdResult<Self> {
        let height = height.unwrap_or(width);
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(MicrodropError::validation(format!(
                "Electrode {} must have a positive size (got {} x {})",
                id, width, height
            )));
        }
        Ok(Self {
            id,
            x,
            y,
            width,
            height,
            channels: Vec::new(),
        })
    }

    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = channels;
        self
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Rectangle in pixel space for a uniform `scale`.
    pub fn rect(&self, scale: f32) -> Rect {
        Rect::new(
            scale * self.x,
            scale * self.y,
            scale * self.width,
            scale * self.height,
        )
    }

    pub fn contains(&self, px: f32, py: f32, scale: f32) -> bool {
        self.rect(scale).contains(px, py)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceGeometry {
    electrodes: Vec<Electrode>,
}

impl DeviceGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts an existing electrode list. Ids must be unique and channels
    /// within `MAX_CHANNEL`.
    pub fn from_electrodes(electrodes: Vec<Electrode>) -> MdResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for e in &electrodes {
            if !seen.insert(e.id) {
                return Err(MicrodropError::validation(format!(
                    "Duplicate electrode id {}",
                    e.id
                )));
            }
            Electrode::new(e.id, e.x, e.y, e.width, Some(e.height))?;
            if let Some(&c) = e.channels.iter().find(|&&c| c > MAX_CHANNEL) {
                return Err(MicrodropError::validation(format!(
                    "Electrode {} references channel {} (max {})",
                    e.id, c, MAX_CHANNEL
                )));
            }
        }
        Ok(Self { electrodes })
    }

    /// Appends an electrode and returns its id (next free sequential id).
    pub fn push(&mut self, x: f32, y: f32, width: f32, height: Option<f32>) -> MdResult<usize> {
        let id = self.next_id();
        self.electrodes.push(Electrode::new(id, x, y, width, height)?);
        Ok(id)
    }

    fn next_id(&self) -> usize {
        self.electrodes
            .iter()
            .map(|e| e.id + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    pub fn len(&self) -> usize {
        self.electrodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.electrodes.is_empty()
    }

    pub fn electrode(&self, id: usize) -> Option<&Electrode> {
        self.electrodes.iter().find(|e| e.id == id)
    }

    pub fn electrode_mut(&mut self, id: usize) -> Option<&mut Electrode> {
        self.electrodes.iter_mut().find(|e| e.id == id)
    }

    /// Highest channel referenced by any electrode.
    pub fn max_channel(&self) -> Option<usize> {
        self.electrodes
            .iter()
            .flat_map(|e| e.channels.iter().copied())
            .max()
    }

    /// First electrode (in definition order) whose scaled rectangle strictly
    /// contains the point.
    pub fn hit_test(&self, px: f32, py: f32, scale: f32) -> Option<&Electrode> {
        self.electrodes.iter().find(|e| e.contains(px, py, scale))
    }

    /// Bounding box of all electrodes in device units.
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.electrodes.first()?;
        let (mut x0, mut y0) = (first.x, first.y);
        let (mut x1, mut y1) = (first.x + first.width, first.y + first.height);
        for e in &self.electrodes[1..] {
            x0 = x0.min(e.x);
            y0 = y0.min(e.y);
            x1 = x1.max(e.x + e.width);
            y1 = y1.max(e.y + e.height);
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// The hand-measured 35 electrode test chip, shifted by (+5, +5) so it
    /// clears the canvas edge at scale 10.
    pub fn prototype() -> Self {
        // (x, y, width, height)
        const LAYOUT: [(f32, f32, f32, Option<f32>); 35] = [
            (24.0, 16.0, 1.9, None),
            (24.0, 14.0, 1.9, None),
            (24.0, 12.0, 1.9, None),
            (22.0, 6.0, 5.9, None),
            (22.0, 0.0, 5.9, None),
            (22.0, 16.0, 1.9, None),
            (20.0, 16.0, 1.9, None),
            (6.0, 0.0, 5.9, None),
            (16.0, 9.0, 1.9, Some(0.9)),
            (16.0, 10.0, 1.9, Some(0.9)),
            (16.0, 11.0, 1.9, Some(0.9)),
            (16.0, 12.0, 1.9, Some(0.9)),
            (16.0, 13.0, 1.9, Some(0.9)),
            (6.0, 6.0, 5.9, None),
            (8.0, 12.0, 1.9, None),
            (8.0, 14.0, 1.9, None),
            (12.0, 16.0, 1.9, None),
            (10.0, 16.0, 1.9, None),
            (8.0, 16.0, 1.9, None),
            (14.0, 16.0, 1.9, None),
            (16.0, 16.0, 1.9, None),
            (16.0, 14.0, 1.9, None),
            (18.0, 16.0, 1.9, None),
            (16.0, 18.0, 1.9, None),
            (16.0, 20.0, 1.9, None),
            (16.0, 22.0, 1.9, None),
            (14.5, 24.25, 1.4, None),
            (16.0, 24.0, 1.9, None),
            (18.0, 24.25, 1.4, None),
            (13.0, 24.25, 1.4, None),
            (19.5, 24.25, 1.4, None),
            (21.0, 22.0, 5.9, None),
            (7.0, 22.0, 5.9, None),
            (1.0, 22.0, 5.9, None),
            (27.0, 22.0, 5.9, None),
        ];
        const OFFSET: f32 = 5.0;

        let electrodes = LAYOUT
            .iter()
            .enumerate()
            .map(|(id, &(x, y, w, h))| Electrode {
                id,
                x: x + OFFSET,
                y: y + OFFSET,
                width: w,
                height: h.unwrap_or(w),
                channels: Vec::new(),
            })
            .collect();

        DeviceGeometry { electrodes }
    }
}
