/*
 *  display/drivers/mock.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock HID backend for testing without hardware
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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::constants::{CMD_DRAW, REPORT_ID, REPORT_SIZE};
use crate::display::codec::decode_segment;
use crate::display::error::PanelError;
use crate::display::report::ReportHeader;
use crate::display::traits::{BoxedHandle, DeviceBackend, DeviceFilter, PanelHandle};
use crate::frame::Frame;

/// Mock backend for testing
///
/// Simulates a panel that can be plugged, unplugged and made to fail. All
/// handles it opens share one `MockPanelState`, so a test can keep the state
/// and inspect every report that reached the "device", along with the
/// panel image those reports produced.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockPanelState>>,
}

/// Shared state for the mock panel (inspected by tests)
#[derive(Debug)]
pub struct MockPanelState {
    /// Whether discovery finds the device
    pub present: bool,

    /// Number of successful opens
    pub open_count: usize,

    /// Number of handles dropped
    pub close_count: usize,

    /// Every report delivered, in order
    pub reports: Vec<Vec<u8>>,

    /// Deliver this many more reports, then fail the next one (one-shot)
    pub fail_after: Option<usize>,

    /// Fail every send while set
    pub fail_all: bool,

    /// Simulated transfer time per report
    pub report_delay: Option<Duration>,

    /// Panel image as last drawn
    pub screen: Frame,
}

impl Default for MockPanelState {
    fn default() -> Self {
        Self {
            present: true,
            open_count: 0,
            close_count: 0,
            reports: Vec::new(),
            fail_after: None,
            fail_all: false,
            report_delay: None,
            screen: Frame::blank(),
        }
    }
}

impl MockPanelState {
    /// Complete frames seen by the panel, in delivery order.
    ///
    /// A frame counts once its right half has arrived, matching how the
    /// channel always sends left then right.
    pub fn delivered_frames(&self) -> Vec<Frame> {
        let mut screen = Frame::blank();
        let mut frames = Vec::new();
        for report in &self.reports {
            let header = parse_header(report);
            decode_segment(&report[6..], header.segment(), &mut screen);
            if header.x > 0 {
                frames.push(screen.clone());
            }
        }
        frames
    }
}

impl MockBackend {
    /// A mock whose device is plugged in
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(MockPanelState::default())) }
    }

    /// A mock with nothing attached
    pub fn absent() -> Self {
        let backend = Self::new();
        backend.lock().present = false;
        backend
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockPanelState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockPanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for MockBackend {
    fn open(&mut self, _filter: &DeviceFilter) -> Result<Option<BoxedHandle>, PanelError> {
        let mut state = self.lock();
        if !state.present {
            return Ok(None);
        }
        state.open_count += 1;
        Ok(Some(Box::new(MockHandle { state: Arc::clone(&self.state) })))
    }
}

/// Handle returned by [`MockBackend`]
#[derive(Debug)]
pub struct MockHandle {
    state: Arc<Mutex<MockPanelState>>,
}

impl PanelHandle for MockHandle {
    fn describe(&self) -> String {
        "Mock OLED / oled-gif".to_string()
    }

    fn send_feature_report(&mut self, report: &[u8]) -> Result<(), PanelError> {
        let delay = self.state.lock().unwrap_or_else(PoisonError::into_inner).report_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.present || state.fail_all {
            return Err(PanelError::DeviceIo("Simulated send failure".to_string()));
        }
        match state.fail_after {
            Some(0) => {
                state.fail_after = None;
                return Err(PanelError::DeviceIo("Simulated send failure".to_string()));
            }
            Some(n) => state.fail_after = Some(n - 1),
            None => {}
        }

        if report.len() != REPORT_SIZE || report[0] != REPORT_ID || report[1] != CMD_DRAW {
            return Err(PanelError::DeviceIo(format!("malformed report ({} bytes)", report.len())));
        }

        let header = parse_header(report);
        decode_segment(&report[6..], header.segment(), &mut state.screen);
        state.reports.push(report.to_vec());
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).close_count += 1;
    }
}

fn parse_header(report: &[u8]) -> ReportHeader {
    ReportHeader {
        report_id: report[0],
        command: report[1],
        x: report[2],
        y: report[3],
        width: report[4],
        height: report[5],
    }
}
