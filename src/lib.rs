/*
 *  lib.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback engine for 128x64 monochrome OLED panels on USB HID
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

pub mod config;
pub mod constants;
pub mod decoder;
pub mod display;
pub mod frame;
pub mod playback;

pub use decoder::{FrameCache, FrameSource, GifFileDecoder};
pub use display::{DeviceChannel, DeviceFilter, PanelError, StatusOverlay};
pub use frame::{Frame, FrameSequence};
pub use playback::{PlaybackController, PlaybackMode, PlaybackSettings, PlayerState, Status};
