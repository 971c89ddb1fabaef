/*
 *  display/traits.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for the HID transport abstraction
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

use crate::constants::{ANY_INTERFACE, PRODUCT_IDS, SCREEN_INTERFACE, VENDOR_ID};
use crate::display::error::PanelError;

/// Which HID devices count as "the panel"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    /// USB vendor id
    pub vendor_id: u16,

    /// Accepted product ids
    pub product_ids: Vec<u16>,

    /// Interface carrying the screen endpoint
    pub interface: i32,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_ids: PRODUCT_IDS.to_vec(),
            interface: SCREEN_INTERFACE,
        }
    }
}

impl DeviceFilter {
    /// Does an enumerated device match?
    ///
    /// An interface number of -1 means the platform exposes a single
    /// interface, which is then taken as the screen interface.
    pub fn matches(&self, vendor_id: u16, product_id: u16, interface: i32) -> bool {
        vendor_id == self.vendor_id
            && self.product_ids.contains(&product_id)
            && (interface == self.interface || interface == ANY_INTERFACE)
    }
}

/// An open panel able to receive feature reports
///
/// Implementations are owned by exactly one `DeviceChannel` and are never
/// called from two threads at once. Dropping the handle closes the device.
pub trait PanelHandle: Send {
    /// Human readable identification (product / manufacturer)
    fn describe(&self) -> String;

    /// Push one complete feature report, report id in byte 0
    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), PanelError>;
}

/// Discovery side of a transport
///
/// `open` returns `Ok(None)` when no device matched; that is the ordinary
/// outcome when the hardware is unplugged or asleep and must not be an error.
pub trait DeviceBackend: Send {
    fn open(&mut self, filter: &DeviceFilter) -> Result<Option<BoxedHandle>, PanelError>;
}

/// Type alias for boxed panel handles
pub type BoxedHandle = Box<dyn PanelHandle>;

/// Type alias for boxed backends
pub type BoxedBackend = Box<dyn DeviceBackend>;
