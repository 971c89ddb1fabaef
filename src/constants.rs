/*
 *  constants.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel geometry, HID identifiers and protocol constants
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

use std::time::Duration;

// Panel geometry
/// The width of the OLED panel in pixels.
pub const PANEL_WIDTH: u32 = 128;
/// The height of the OLED panel in pixels.
pub const PANEL_HEIGHT: u32 = 64;
/// Widest region a single draw report can carry; a full frame is sent as two of these.
pub const SEGMENT_WIDTH: u32 = PANEL_WIDTH / 2;

// HID discovery
/// SteelSeries vendor id.
pub const VENDOR_ID: u16 = 0x1038;
/// Product ids known to carry the 128x64 panel (GameDAC / Arctis Nova base stations).
pub const PRODUCT_IDS: [u16; 4] = [0x12cb, 0x12cd, 0x12e0, 0x12e5];
/// HID interface exposing the screen endpoint.
pub const SCREEN_INTERFACE: i32 = 4;
/// Interface number reported by platforms that expose a single collection.
pub const ANY_INTERFACE: i32 = -1;

// Draw report layout
/// Total feature report length, header included.
pub const REPORT_SIZE: usize = 1024;
/// Feature report id.
pub const REPORT_ID: u8 = 0x06;
/// Command byte for a bitmap draw.
pub const CMD_DRAW: u8 = 0x93;
/// Fixed header prefix: report id, command, x, y, width, height.
pub const REPORT_HEADER_LEN: usize = 6;

// Timing defaults
/// Delay between two frames of an animation.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(50);
/// How long a cycling session stays on one animation before moving on.
pub const DEFAULT_DWELL: Duration = Duration::from_secs(20);
/// Upper bound on one wait of the cycle timer while the render loop finishes an item.
pub const TIMER_TICK: Duration = Duration::from_millis(100);

// Status overlay texts
pub const MSG_DECODE_ERROR: &str = "GIF Error";
pub const MSG_EMPTY_CYCLE: &str = "Add GIFs!";
pub const MSG_STOPPED: &str = "GIF Stopped!";
pub const MSG_DEVICE_ERROR: &str = "Device Error";
pub const MSG_NEW_SELECTION: &str = "New GIF Selected!";
pub const MSG_SHUTDOWN: &str = "Spin Dial To Reset ->";

/// How long "GIF Stopped!" stays up before the panel is blanked.
pub const STOPPED_CLEAR_AFTER: Duration = Duration::from_secs(2);
/// How long "New GIF Selected!" stays up before the panel is blanked.
pub const SELECTION_CLEAR_AFTER: Duration = Duration::from_secs(1);
/// How long an error notice stays up before the panel is blanked.
pub const ERROR_CLEAR_AFTER: Duration = Duration::from_secs(2);

/// File extensions picked up when cycling a folder.
pub const CYCLE_EXTENSIONS: [&str; 1] = ["gif"];
