/*
 *  playback/cycle_timer.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Dwell timer driving folder cycling
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

use log::{debug, info};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::playback::session::Session;

/// Advances the cycle index once per dwell period
///
/// The timer only proposes the next index. It then waits for the render
/// loop to adopt it before the next dwell starts, so an item that takes
/// longer than the dwell to play through is never skipped.
#[derive(Debug, Clone, Copy)]
pub struct CycleTimer {
    count: usize,
    dwell: Duration,
}

impl CycleTimer {
    pub fn new(count: usize, dwell: Duration) -> Self {
        Self { count, dwell }
    }

    /// Index following `current`, wrapping at the end of the folder.
    pub fn next_index(&self, current: usize) -> usize {
        if self.count == 0 { 0 } else { (current + 1) % self.count }
    }

    /// Run on the calling thread until the session stops.
    pub fn run(&self, session: &Session) {
        debug!("Cycle timer started: {} item(s), dwell {:?}", self.count, self.dwell);
        while session.sleep(self.dwell) {
            let next = self.next_index(session.index());
            info!("Cycle advancing to item {} of {}", next + 1, self.count);
            session.propose(next);
            if !session.wait_adopted() {
                break;
            }
        }
        debug!("Cycle timer exiting");
    }

    /// Run on a named background thread.
    pub fn spawn(self, session: Arc<Session>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("oled-cycle-timer".into())
            .spawn(move || self.run(&session))
    }
}
