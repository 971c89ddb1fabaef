/*
 *  frame.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Monochrome frame raster and decoded frame sequences
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use image::GrayImage;
use std::path::{Path, PathBuf};

use crate::constants::{PANEL_HEIGHT, PANEL_WIDTH};

/// A 1-bit raster, row-major.
///
/// Frames coming out of the decoder always have the panel's native size and
/// are never mutated afterwards; invert is applied when a frame is encoded,
/// not stored here. Overlays draw into a blank frame through the
/// embedded-graphics `DrawTarget` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl Frame {
    /// Blank (all off) frame of arbitrary size.
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    /// Blank frame with the panel's native size.
    pub fn blank() -> Self {
        Self::new(PANEL_WIDTH, PANEL_HEIGHT)
    }

    /// Build a frame from a predicate over (x, y).
    pub fn from_fn(width: u32, height: u32, mut on: impl FnMut(u32, u32) -> bool) -> Self {
        let mut frame = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if on(x, y) {
                    frame.set(x, y, true);
                }
            }
        }
        frame
    }

    /// Take an already binarised luma image; any non-zero sample is foreground.
    pub fn from_luma(img: &GrayImage) -> Self {
        Self::from_fn(img.width(), img.height(), |x, y| img.get_pixel(x, y).0[0] > 0)
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// True when the frame matches the panel it will be sent to.
    pub fn is_panel_sized(&self) -> bool {
        self.dimensions() == (PANEL_WIDTH, PANEL_HEIGHT)
    }

    /// Pixel state; out of bounds reads as off.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        self.idx(Point::new(x as i32, y as i32))
            .is_some_and(|i| self.buf[i].is_on())
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if let Some(i) = self.idx(Point::new(x as i32, y as i32)) {
            self.buf[i] = BinaryColor::from(on);
        }
    }

    pub fn count_on(&self) -> usize {
        self.buf.iter().filter(|p| p.is_on()).count()
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else { return Ok(()) };
        let (x0, x1) = (area.top_left.x as usize, bottom_right.x as usize);
        for y in area.top_left.y as usize..=bottom_right.y as usize {
            let base = y * self.w;
            self.buf[base + x0..=base + x1].fill(color);
        }
        Ok(())
    }
}

/// All frames of one source file, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    path: PathBuf,
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new(path: impl Into<PathBuf>, frames: Vec<Frame>) -> Self {
        Self { path: path.into(), frames }
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn frames(&self) -> &[Frame] { &self.frames }
    pub fn len(&self) -> usize { self.frames.len() }
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
