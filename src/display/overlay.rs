/*
 *  display/overlay.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Transient status messages rendered straight to the panel
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

use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};
use embedded_text::{style::TextBoxStyleBuilder, TextBox};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::{PANEL_HEIGHT, PANEL_WIDTH};
use crate::display::channel::DeviceChannel;
use crate::display::error::PanelError;
use crate::frame::Frame;

/// Draw `text` centred (and wrapped if needed) over the whole target.
pub fn draw_centered<D>(target: &mut D, text: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Middle)
        .build();
    let bounds = Rectangle::new(Point::zero(), target.size());
    TextBox::with_textbox_style(text, bounds, text_style, textbox_style).draw(target)?;
    Ok(())
}

/// Render a panel sized frame carrying `text`.
pub fn render_text(text: &str) -> Frame {
    let mut canvas = Frame::new(PANEL_WIDTH, PANEL_HEIGHT);
    let Ok(()) = draw_centered(&mut canvas, text);
    canvas
}

/// Short notices pushed through the shared device channel
///
/// Overlays never touch the decode cache or playback state. The message
/// honours the caller's invert flag; the optional clear afterwards is always
/// a dark panel. Every notice claims a generation and only reaches the panel
/// while it is still the newest one, so a pending notice or auto-clear never
/// lands on top of a newer message or a freshly started animation.
#[derive(Clone)]
pub struct StatusOverlay {
    channel: Arc<DeviceChannel>,
    generation: Arc<Mutex<u64>>,
}

impl StatusOverlay {
    pub fn new(channel: Arc<DeviceChannel>) -> Self {
        Self { channel, generation: Arc::new(Mutex::new(0)) }
    }

    /// Send `text` now, then blank the panel after `clear_after` (blocking).
    pub fn show(&self, text: &str, invert: bool, clear_after: Option<Duration>) -> Result<(), PanelError> {
        let generation = self.claim();
        self.deliver(generation, text, invert, clear_after)
    }

    /// Fire-and-forget variant of [`show`](Self::show) on its own thread.
    ///
    /// The generation is claimed before returning, so a later `show` or
    /// [`cancel_pending`](Self::cancel_pending) always wins. Failures are
    /// only logged: the panel may well be the thing that is broken.
    pub fn notify(&self, text: &str, invert: bool, clear_after: Option<Duration>) -> Option<JoinHandle<()>> {
        let generation = self.claim();
        let overlay = self.clone();
        let text = text.to_string();
        thread::Builder::new()
            .name("oled-overlay".into())
            .spawn(move || {
                if let Err(e) = overlay.deliver(generation, &text, invert, clear_after) {
                    warn!("Status overlay {:?} not shown: {}", text, e);
                }
            })
            .map_err(|e| warn!("Could not spawn overlay thread: {}", e))
            .ok()
    }

    /// Drop every notice and auto-clear still waiting to be sent.
    ///
    /// Once this returns nothing older reaches the panel.
    pub fn cancel_pending(&self) {
        let generation = self.claim();
        debug!("Overlay #{} cancels pending notices", generation);
    }

    fn claim(&self) -> u64 {
        let mut generation = self.lock_generation();
        *generation += 1;
        *generation
    }

    fn deliver(&self, generation: u64, text: &str, invert: bool, clear_after: Option<Duration>) -> Result<(), PanelError> {
        debug!("Overlay #{}: {:?}", generation, text);
        if !self.send_if_current(generation, &render_text(text), invert)? {
            debug!("Overlay #{} superseded before it was shown", generation);
            return Ok(());
        }

        if let Some(delay) = clear_after {
            thread::sleep(delay);
            if !self.send_if_current(generation, &Frame::blank(), false)? {
                debug!("Overlay #{} superseded, skipping clear", generation);
            }
        }
        Ok(())
    }

    /// Send `frame` unless a newer generation was claimed; the check and the
    /// send happen under one lock.
    fn send_if_current(&self, generation: u64, frame: &Frame, invert: bool) -> Result<bool, PanelError> {
        let current = self.lock_generation();
        if *current != generation {
            return Ok(false);
        }
        self.channel.send(frame, invert)?;
        Ok(true)
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
