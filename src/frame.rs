//! Typed output frame and its ANSI serialization.

use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use crate::Vector3;

/// Glyph written for every covered cell. The cell's foreground color carries
/// all of the pixel information.
pub const PIXEL_GLYPH: char = '\u{2588}';

/// 24-bit color of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8 { r: 0, g: 0, b: 0 };

    /// Quantizes a `[0, 1]` color vector, rounding to the nearest step.
    pub fn from_unit(color: Vector3) -> Self {
        let channel = |v: f32| libm::roundf(v.clamp(0.0, 1.0) * 255.0) as u8;
        Rgb8 {
            r: channel(color.x),
            g: channel(color.y),
            b: channel(color.z),
        }
    }
}

/// One rendered frame: a glyph grid plus a color grid, both `height × width`,
/// and the background color the frame was cleared with.
///
/// The frame is plain data. Writing it to a terminal is the backend's job;
/// [`Frame::encode_ansi`] produces the default 24-bit escape encoding.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    width: usize,
    height: usize,
    glyphs: Vec<char>,
    colors: Vec<Rgb8>,
    pub background: Rgb8,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resizes to `width × height` and clears every cell to a space over
    /// black, keeping the allocations.
    pub fn reset(&mut self, width: usize, height: usize, background: Rgb8) {
        self.width = width;
        self.height = height;
        self.background = background;
        let len = width * height;
        self.glyphs.clear();
        self.glyphs.resize(len, ' ');
        self.colors.clear();
        self.colors.resize(len, Rgb8::BLACK);
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> char {
        self.glyphs[y * self.width + x]
    }

    pub fn color_at(&self, x: usize, y: usize) -> Rgb8 {
        self.colors[y * self.width + x]
    }

    pub(crate) fn put(&mut self, x: usize, y: usize, glyph: char, color: Rgb8) {
        let idx = y * self.width + x;
        self.glyphs[idx] = glyph;
        self.colors[idx] = color;
    }

    /// Serializes the frame with 24-bit ANSI escapes.
    ///
    /// Emits the background set, a cursor-home, then every row with a
    /// foreground escape only where the color changes from the previous cell,
    /// and a final attribute reset.
    pub fn encode_ansi(&self, out: &mut String) {
        let bg = self.background;
        let _ = write!(out, "\x1b[48;2;{};{};{}m", bg.r, bg.g, bg.b);
        out.push_str("\x1b[H");

        let mut last: Option<Rgb8> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.colors[idx];
                if last != Some(color) {
                    let _ = write!(out, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b);
                    last = Some(color);
                }
                out.push(self.glyphs[idx]);
            }
            out.push('\n');
        }

        out.push_str("\x1b[0m");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unit_rounds_and_clamps() {
        let c = Rgb8::from_unit(Vector3::new(0.5, -1.0, 2.0));
        assert_eq!(c, Rgb8 { r: 128, g: 0, b: 255 });
    }

    #[test]
    fn encode_elides_repeated_colors() {
        let mut frame = Frame::new();
        frame.reset(3, 1, Rgb8 { r: 1, g: 2, b: 3 });
        let red = Rgb8 { r: 255, g: 0, b: 0 };
        frame.put(0, 0, PIXEL_GLYPH, red);
        frame.put(1, 0, PIXEL_GLYPH, red);

        let mut out = String::new();
        frame.encode_ansi(&mut out);
        assert_eq!(
            out,
            "\x1b[48;2;1;2;3m\x1b[H\x1b[38;2;255;0;0m\u{2588}\u{2588}\x1b[38;2;0;0;0m \n\x1b[0m"
        );
    }

    #[test]
    fn reset_reclears_cells() {
        let mut frame = Frame::new();
        frame.reset(2, 2, Rgb8::BLACK);
        frame.put(1, 1, PIXEL_GLYPH, Rgb8 { r: 9, g: 9, b: 9 });
        frame.reset(2, 2, Rgb8::BLACK);
        assert_eq!(frame.glyph_at(1, 1), ' ');
        assert_eq!(frame.color_at(1, 1), Rgb8::BLACK);
    }
}
