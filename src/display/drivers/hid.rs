/*
 *  display/drivers/hid.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  hidapi backed discovery and feature report transport
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

use hidapi::{HidApi, HidDevice};
use log::{debug, info, warn};

use crate::display::error::PanelError;
use crate::display::traits::{BoxedHandle, DeviceBackend, DeviceFilter, PanelHandle};

/// Real USB HID backend
///
/// The hidapi context is created on first discovery and its device list is
/// refreshed on every later one, so a panel plugged in mid-session is found
/// on the next reopen.
#[derive(Default)]
pub struct HidBackend {
    api: Option<HidApi>,
}

impl HidBackend {
    pub fn new() -> Self {
        Self { api: None }
    }

    fn api(&mut self) -> Result<&HidApi, PanelError> {
        let api = match self.api.take() {
            Some(mut api) => {
                api.refresh_devices()?;
                api
            }
            None => HidApi::new()?,
        };
        Ok(&*self.api.insert(api))
    }
}

impl DeviceBackend for HidBackend {
    fn open(&mut self, filter: &DeviceFilter) -> Result<Option<BoxedHandle>, PanelError> {
        let api = self.api()?;

        for info in api.device_list() {
            if info.vendor_id() != filter.vendor_id || !filter.product_ids.contains(&info.product_id()) {
                continue;
            }
            debug!(
                "Found potential device: VID=0x{:04x}, PID=0x{:04x}, Path={}, Interface={}",
                info.vendor_id(),
                info.product_id(),
                info.path().to_string_lossy(),
                info.interface_number()
            );
            if !filter.matches(info.vendor_id(), info.product_id(), info.interface_number()) {
                continue;
            }

            match info.open_device(api) {
                Ok(device) => {
                    let panel = HidPanel::new(device);
                    info!("Successfully opened: {}", panel.describe());
                    return Ok(Some(Box::new(panel)));
                }
                Err(e) => {
                    warn!("Could not open device {}: {}", info.path().to_string_lossy(), e);
                }
            }
        }

        Ok(None)
    }
}

/// An opened panel; closing happens when hidapi drops the device
pub struct HidPanel {
    device: HidDevice,
    name: String,
}

impl HidPanel {
    fn new(device: HidDevice) -> Self {
        let product = device.get_product_string().ok().flatten().unwrap_or_default();
        let manufacturer = device.get_manufacturer_string().ok().flatten().unwrap_or_default();
        Self { device, name: format!("{} / {}", product, manufacturer) }
    }
}

impl PanelHandle for HidPanel {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), PanelError> {
        self.device.send_feature_report(report)?;
        Ok(())
    }
}
