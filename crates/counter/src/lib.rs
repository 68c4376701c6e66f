//! Tick-driven debt extrapolator.
//!
//! The counter starts unseeded ("loading"), is seeded once from the fetched
//! snapshot, and from then on only ever moves up: one [`Tick`] adds
//! [`INCREMENT_PER_SECOND`]. Observers read through [`Counter::current`];
//! nothing outside this crate touches the state directly.

use std::sync::{Arc, RwLock};

use tracing::debug;

/// Assumed debt growth in dollars per elapsed second.
///
/// A hardcoded approximation (~$4B/day), deliberately not derived from
/// observed data between fetches.
pub const INCREMENT_PER_SECOND: f64 = 46296.2962962963;

/// One firing of the 1 Hz scheduler. Handed to [`Counter::apply`] by
/// whoever owns the timer.
#[derive(Debug, Clone, Copy)]
pub struct Tick;

#[derive(Clone, Default)]
pub struct Counter {
    state: Arc<RwLock<Option<f64>>>,
}

impl Counter {
    /// Unseeded counter. Clones share the same state.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// Seed from a fetched snapshot. The first call wins; later calls are
    /// ignored and return false.
    pub fn seed(&self, value: f64) -> bool {
        if let Ok(mut guard) = self.state.write() {
            if guard.is_none() {
                *guard = Some(value);
                debug!(value, "counter seeded");
                return true;
            }
        }
        false
    }

    /// Advance by one second's worth of growth. No-op while unseeded.
    pub fn apply(&self, _tick: Tick) {
        if let Ok(mut guard) = self.state.write() {
            if let Some(value) = guard.as_mut() {
                *value += INCREMENT_PER_SECOND;
            }
        }
    }

    /// Current extrapolated figure, or None while still loading.
    pub fn current(&self) -> Option<f64> {
        self.state.read().map(|guard| *guard).unwrap_or(None)
    }
}
