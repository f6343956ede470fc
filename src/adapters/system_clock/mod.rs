// System clock adapter

use chrono::{Local, NaiveDateTime};

use crate::ports::*;

/// Local wall-clock time
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
