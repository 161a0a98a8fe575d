
//! Frame identifier timestamps.
//!
//! Every reset stamps the context with a fresh 48-bit identifier obtained
//! from a process-wide timestamp provider, so all passes of one model
//! lineage share the identifier in their headers. Without an installed
//! provider, a monotonic counter keeps identifiers distinct within the
//! process.

use crate::error::{Error, Result};
use crate::header::MAX_IDENTIFIER;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;


/// Returns the current mission timestamp. The value must be monotonically
/// nondecreasing and below 2^48; the callback must be short and
/// non-blocking, it runs inside `initialise`, `reset` and every primary
/// pass.
pub type TimestampFn = fn() -> u64;


static TIMESTAMP_FN: Mutex<Option<TimestampFn>> = Mutex::new(None);
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);


/// Installs the process-wide timestamp provider, replacing any previous one.
/// Pass `None` to fall back to the built-in monotonic counter.
///
/// Install once at startup. Installing while other threads are compressing
/// is memory-safe but leaves unspecified which provider those threads see.
pub fn set_timestamp_func(provider: Option<TimestampFn>) {
    match TIMESTAMP_FN.lock() {
        Ok(mut installed) => *installed = provider,
        Err(poisoned) => *poisoned.into_inner() = provider,
    }
}

/// A fresh identifier for the next model lineage.
pub(crate) fn next_identifier() -> Result<u64> {
    let provider = match TIMESTAMP_FN.lock() {
        Ok(installed) => *installed,
        Err(poisoned) => *poisoned.into_inner(),
    };

    let timestamp = match provider {
        Some(function) => function(),
        None => FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed),
    };

    if timestamp > MAX_IDENTIFIER {
        return Err(Error::TimestampInvalid);
    }

    Ok(timestamp)
}
