/*
 *  display/error.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the panel engine
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

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for device, decode and playback operations
///
/// Every variant is recoverable at session granularity: the failing session
/// ends and the controller goes back to idle. Dimension mismatches at the
/// codec/framer level are not represented here, they are assertions.
#[derive(Debug, Error)]
pub enum PanelError {
    /// No matching HID device is attached (or it is asleep)
    #[error("compatible USB panel not found (vendor 0x{vendor_id:04x})")]
    DeviceNotFound { vendor_id: u16 },

    /// A feature report could not be delivered; the handle has been dropped
    #[error("report transmission failed: {0}")]
    DeviceIo(String),

    /// Source file unreadable or without a single usable frame
    #[error("could not decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    /// Cycle folder holds nothing playable
    #[error("no playable files in {}", .0.display())]
    EmptyCycle(PathBuf),

    /// Underlying IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PanelError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PanelError::Decode { path: path.into(), reason: reason.to_string() }
    }

    /// Short text suitable for the panel itself.
    pub fn overlay_text(&self) -> &'static str {
        use crate::constants::{MSG_DECODE_ERROR, MSG_DEVICE_ERROR, MSG_EMPTY_CYCLE};
        match self {
            PanelError::DeviceNotFound { .. } | PanelError::DeviceIo(_) => MSG_DEVICE_ERROR,
            PanelError::Decode { .. } | PanelError::Io(_) => MSG_DECODE_ERROR,
            PanelError::EmptyCycle(_) => MSG_EMPTY_CYCLE,
        }
    }
}

// Conversion from hidapi errors
impl From<hidapi::HidError> for PanelError {
    fn from(err: hidapi::HidError) -> Self {
        PanelError::DeviceIo(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PanelError::DeviceNotFound { vendor_id: 0x1038 };
        assert_eq!(err.to_string(), "compatible USB panel not found (vendor 0x1038)");

        let err = PanelError::decode("/tmp/missing.gif", "no frames");
        assert_eq!(err.to_string(), "could not decode /tmp/missing.gif: no frames");

        let err = PanelError::EmptyCycle(PathBuf::from("/tmp/cycle"));
        assert_eq!(err.to_string(), "no playable files in /tmp/cycle");
    }

    #[test]
    fn test_overlay_text() {
        assert_eq!(PanelError::DeviceIo("pipe".into()).overlay_text(), "Device Error");
        assert_eq!(PanelError::EmptyCycle(PathBuf::new()).overlay_text(), "Add GIFs!");
        assert_eq!(PanelError::decode("a.gif", "x").overlay_text(), "GIF Error");
    }
}
