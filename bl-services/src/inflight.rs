//! Per-booking in-flight guards.
//!
//! Every mutating trigger holds a guard for its booking while its network
//! round-trip is outstanding, so a double-tap can never produce two
//! concurrent calls for the same booking. Different bookings proceed in
//! parallel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use bl_core::error::{BlError, BlResult};

/// Set of booking ids with an outstanding mutating call.
#[derive(Clone, Default)]
pub struct InFlightSet {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the booking. Fails with [`BlError::InFlight`] if another
    /// trigger already holds it; the claim is released when the returned
    /// guard drops.
    pub fn begin(&self, booking_id: &str) -> BlResult<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(|p| p.into_inner());
        if !ids.insert(booking_id.to_string()) {
            return Err(BlError::InFlight(booking_id.to_string()));
        }
        Ok(InFlightGuard {
            ids: Arc::clone(&self.ids),
            booking_id: booking_id.to_string(),
        })
    }

    /// Whether a trigger is currently in flight for the booking.
    pub fn contains(&self, booking_id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(booking_id)
    }
}

/// Releases the claim on drop.
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    booking_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.booking_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_refused() {
        let set = InFlightSet::new();
        let _guard = set.begin("bk-1").unwrap();
        assert!(matches!(set.begin("bk-1"), Err(BlError::InFlight(_))));
        // A different booking is unaffected
        assert!(set.begin("bk-2").is_ok());
    }

    #[test]
    fn test_claim_released_on_drop() {
        let set = InFlightSet::new();
        {
            let _guard = set.begin("bk-1").unwrap();
            assert!(set.contains("bk-1"));
        }
        assert!(!set.contains("bk-1"));
        assert!(set.begin("bk-1").is_ok());
    }
}
