/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Time source abstraction to support testing

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Trait with a `now()` function returning the current time
pub trait TimeSource: Debug + Send + Sync {
    /// Returns the current time
    fn now(&self) -> SystemTime;
}

/// Time source delegating to `SystemTime::now()`
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Creates a new `SystemTimeSource`
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A shared reference to a time source
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Manually controlled time source for tests
///
/// The clock only moves when [`set_time`](ManualTimeSource::set_time) or
/// [`advance`](ManualTimeSource::advance) is called. Clones share the same
/// underlying instant.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    time: Arc<Mutex<SystemTime>>,
}

impl ManualTimeSource {
    /// Creates a new `ManualTimeSource` starting at `start_time`
    pub fn new(start_time: SystemTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(start_time)),
        }
    }

    /// Sets the current time
    pub fn set_time(&self, time: SystemTime) {
        *self.time.lock().unwrap() = time;
    }

    /// Moves the clock forward by `duration`
    pub fn advance(&self, duration: Duration) {
        let mut time = self.time.lock().unwrap();
        *time += duration;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> SystemTime {
        *self.time.lock().unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manual_time_source_is_settable() {
        let epoch = SystemTime::UNIX_EPOCH;
        let time_source = ManualTimeSource::new(epoch);
        assert_eq!(epoch, time_source.now());

        time_source.advance(Duration::from_secs(10));
        assert_eq!(epoch + Duration::from_secs(10), time_source.now());

        let clone = time_source.clone();
        clone.set_time(epoch + Duration::from_secs(100));
        assert_eq!(epoch + Duration::from_secs(100), time_source.now());
    }
}
