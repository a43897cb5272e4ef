use crate::geometry::Rect;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

/// 2D drawing surface owned by whoever hosts the device view.
pub trait Canvas {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// RGB pixel buffer, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl PixelBuffer {
    /// New buffer painted black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0]; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    /// Binary PPM (P6).
    pub fn write_ppm<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        for px in &self.pixels {
            out.write_all(px)?;
        }
        out.flush()
    }
}

impl Canvas for PixelBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        let c = color.to_bytes();
        self.pixels.iter_mut().for_each(|p| *p = c);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        // Pixel (i, j) is covered when its centre lies inside the rectangle.
        let x0 = (rect.x - 0.5).ceil().max(0.0) as u32;
        let y0 = (rect.y - 0.5).ceil().max(0.0) as u32;
        let x1 = ((rect.right() - 0.5).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((rect.bottom() - 0.5).ceil().max(0.0) as u32).min(self.height);
        let c = color.to_bytes();
        for y in y0..y1 {
            let row = (y * self.width) as usize;
            for x in x0..x1 {
                self.pixels[row + x as usize] = c;
            }
        }
    }
}
