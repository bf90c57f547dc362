//! Liveness of started cycles and specs.
//!
//! A started entity that has not updated within the window is shown as timed out.
//! The label is derived at read time and never stored.

use chrono::{DateTime, Duration, Utc};

/// True while `last_update + window` is still in the future.
pub fn is_live(last_update: DateTime<Utc>, window: Duration, now: DateTime<Utc>) -> bool {
    last_update + window > now
}
