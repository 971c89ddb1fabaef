/*
 *  display/channel.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Device channel: owns the panel handle, serialises sends, lazy reconnect
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

use std::sync::{Mutex, MutexGuard, PoisonError};
use log::{debug, info, warn};

use crate::display::error::PanelError;
use crate::display::report::frame_reports;
use crate::display::traits::{BoxedBackend, BoxedHandle, DeviceFilter};
use crate::frame::Frame;

/// Sole owner of the panel handle
///
/// Every send (render loops and overlays alike) goes through the one mutex
/// in here, so the handle is never touched by two threads at once and the
/// two halves of a frame are never interleaved with another frame's.
///
/// Failures are not retried: a failed transmission drops the handle and the
/// next `send` re-runs discovery.
pub struct DeviceChannel {
    filter: DeviceFilter,
    inner: Mutex<ChannelState>,
}

struct ChannelState {
    backend: BoxedBackend,
    handle: Option<BoxedHandle>,
}

impl ChannelState {
    fn connect(&mut self, filter: &DeviceFilter) -> bool {
        // discard any previous handle first
        if self.handle.take().is_some() {
            debug!("Dropped previous panel handle before reconnect");
        }
        match self.backend.open(filter) {
            Ok(Some(handle)) => {
                info!("Panel connected: {}", handle.describe());
                self.handle = Some(handle);
                true
            }
            Ok(None) => {
                info!("Compatible USB device not found.");
                false
            }
            Err(e) => {
                warn!("Device discovery failed: {}", e);
                false
            }
        }
    }
}

impl DeviceChannel {
    pub fn new(backend: BoxedBackend, filter: DeviceFilter) -> Self {
        Self {
            filter,
            inner: Mutex::new(ChannelState { backend, handle: None }),
        }
    }

    /// Discover and open the panel, replacing any current handle.
    ///
    /// Returns `false` when nothing matched; that is not an error.
    pub fn open(&self) -> bool {
        self.lock().connect(&self.filter)
    }

    /// Deliver one frame as its two draw reports.
    ///
    /// Opens the device first if needed. Any transmission failure (including
    /// on the second report, after the first went through) drops the handle
    /// and the frame counts as undelivered.
    pub fn send(&self, frame: &Frame, invert: bool) -> Result<(), PanelError> {
        let reports = frame_reports(frame, invert);

        let mut state = self.lock();
        if state.handle.is_none() && !state.connect(&self.filter) {
            return Err(PanelError::DeviceNotFound { vendor_id: self.filter.vendor_id });
        }

        let result = match state.handle.as_mut() {
            Some(handle) => reports
                .iter()
                .try_for_each(|report| handle.send_feature_report(report.as_bytes())),
            None => Err(PanelError::DeviceNotFound { vendor_id: self.filter.vendor_id }),
        };

        if let Err(e) = &result {
            warn!("Error sending frame to USB device: {}", e);
            state.handle = None;
        }
        result
    }

    /// Release the handle if open; idempotent.
    pub fn close(&self) {
        if self.lock().handle.take().is_some() {
            info!("Panel handle released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().handle.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
