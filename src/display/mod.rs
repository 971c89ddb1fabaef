/*
 *  display/mod.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel subsystem - wire format, device channel and status overlays
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

// Core trait definitions
pub mod traits;
pub mod error;

// Wire format
pub mod codec;
pub mod report;

// Device ownership and reconnect
pub mod channel;

// Transport backends (hidapi + mock)
pub mod drivers;

// Transient on-panel messages
pub mod overlay;

// Re-exports for convenience
pub use traits::{DeviceBackend, PanelHandle, DeviceFilter, BoxedBackend, BoxedHandle};
pub use error::PanelError;
pub use codec::{Segment, encode_segment, decode_segment};
pub use report::{Report, ReportHeader, frame_reports};
pub use channel::DeviceChannel;
pub use overlay::StatusOverlay;
