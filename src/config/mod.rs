use std::sync::atomic::{AtomicU64, Ordering};

/// Default table load above which a store grows, matched against
/// `num_records / (current_size * RECORDS_PER_BUCKET)`.
const DEFAULT_MAX_LOAD: f64 = 0.5;

static PROCESS_MAX_LOAD: AtomicU64 = AtomicU64::new(0);

/// Sets the process-wide default max load used by subsequent calls to
/// [`crate::Store::open`].
///
/// A store remembers the max load in effect when it was opened; changing
/// the default afterwards has no effect on stores already open. The max
/// load is not persisted in the file format, so a file can be reopened
/// under a different load by calling this before `open`.
pub fn set_max_load(max_load: f64) {
    PROCESS_MAX_LOAD.store(max_load.to_bits(), Ordering::Relaxed);
}

/// Returns the current process-wide default max load (0.5 until changed).
pub fn default_max_load() -> f64 {
    match PROCESS_MAX_LOAD.load(Ordering::Relaxed) {
        0 => DEFAULT_MAX_LOAD,
        bits => f64::from_bits(bits),
    }
}

/// Configuration captured by a [`crate::Store`] at open time.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub max_load: f64,
    pub key_size: u32,
    pub value_size: u32,
}
