/*
 *  playback/session.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Shared state of one playback session
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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::constants::TIMER_TICK;

/// Flags shared between the controller, the render loop and the cycle timer
///
/// `running` is the one source of truth for "keep going". Every wait in
/// here is woken by [`stop`](Session::stop), so a stop is seen within one
/// wake-up rather than at the end of a full frame delay or dwell.
///
/// The cycle index is a two step hand-over: the timer proposes the next
/// index, the render loop commits it once it has finished a pass over the
/// current item. Readers of [`index`](Session::index) only ever see
/// committed values.
#[derive(Debug)]
pub struct Session {
    running: AtomicBool,
    index: AtomicUsize,
    pending: Mutex<Option<usize>>,
    wake: Condvar,
}

impl Session {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(index: usize) -> Self {
        Self {
            running: AtomicBool::new(true),
            index: AtomicUsize::new(index),
            pending: Mutex::new(None),
            wake: Condvar::new(),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wake every waiter.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _guard = self.lock();
        self.wake.notify_all();
    }

    /// Sleep for `duration` unless stopped first.
    ///
    /// Returns whether the session is still running afterwards.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.lock();
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            guard = self
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        self.is_running()
    }

    /// Committed cycle index.
    pub fn index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Offer the render loop a new index; replaces an earlier offer.
    pub fn propose(&self, next: usize) {
        *self.lock() = Some(next);
        self.wake.notify_all();
    }

    /// Adopt a pending index, if any. Call only at an item boundary.
    pub fn take_pending(&self) -> Option<usize> {
        let mut pending = self.lock();
        let next = pending.take();
        if let Some(next) = next {
            self.index.store(next, Ordering::SeqCst);
            self.wake.notify_all();
        }
        next
    }

    /// Block until the current offer has been adopted or the session stops.
    ///
    /// Returns whether the session is still running.
    pub fn wait_adopted(&self) -> bool {
        let mut pending = self.lock();
        while pending.is_some() && self.is_running() {
            pending = self
                .wake
                .wait_timeout(pending, TIMER_TICK)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        self.is_running()
    }

    fn lock(&self) -> MutexGuard<'_, Option<usize>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sleep_runs_to_deadline() {
        let session = Session::new();
        let start = Instant::now();
        assert!(session.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_stop_interrupts_sleep() {
        let session = Arc::new(Session::new());
        let sleeper = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let start = Instant::now();
                let running = session.sleep(Duration::from_secs(10));
                (running, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        session.stop();
        let (running, elapsed) = sleeper.join().unwrap();
        assert!(!running);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_after_stop_returns_at_once() {
        let session = Session::new();
        session.stop();
        let start = Instant::now();
        assert!(!session.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_index_only_changes_when_taken() {
        let session = Session::starting_at(1);
        session.propose(2);
        assert_eq!(session.index(), 1);
        assert_eq!(session.take_pending(), Some(2));
        assert_eq!(session.index(), 2);
        assert_eq!(session.take_pending(), None);
    }

    #[test]
    fn test_later_offer_replaces_earlier() {
        let session = Session::new();
        session.propose(1);
        session.propose(2);
        assert_eq!(session.take_pending(), Some(2));
    }

    #[test]
    fn test_wait_adopted_returns_on_take() {
        let session = Arc::new(Session::new());
        session.propose(1);
        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.wait_adopted())
        };
        thread::sleep(Duration::from_millis(20));
        session.take_pending();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_wait_adopted_returns_on_stop() {
        let session = Arc::new(Session::new());
        session.propose(1);
        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.wait_adopted())
        };
        thread::sleep(Duration::from_millis(20));
        session.stop();
        assert!(!waiter.join().unwrap());
    }
}
