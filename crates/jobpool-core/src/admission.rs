//! Admission filtering for reported handles.
//!
//! Pure predicate, applied both at report time and again at selection time:
//! an entry admitted under yesterday's occupancy may no longer pass once a
//! re-report raised it.

/// Returns whether a handle with the given occupancy and capacity is
/// admissible.
///
/// Rejects when occupancy has reached `accept_threshold`, or when fewer than
/// `min_free_slots` slots remain free. Capacity under-reporting (occupancy
/// exceeding capacity) is not an error here; the free-slot check simply
/// saturates to zero.
#[must_use]
pub fn can_admit(occupancy: u32, capacity: u32, accept_threshold: u32, min_free_slots: u32) -> bool {
    if occupancy >= accept_threshold {
        return false;
    }
    capacity.saturating_sub(occupancy) >= min_free_slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_at_occupancy_threshold() {
        assert!(can_admit(11, 20, 12, 1));
        assert!(!can_admit(12, 20, 12, 1));
        assert!(!can_admit(13, 20, 12, 1));
    }

    #[test]
    fn rejects_when_too_few_free_slots() {
        assert!(can_admit(6, 8, 12, 2));
        assert!(!can_admit(7, 8, 12, 2));
        assert!(!can_admit(8, 8, 12, 1));
    }

    #[test]
    fn overfull_handle_saturates_instead_of_underflowing() {
        assert!(!can_admit(9, 8, 12, 1));
    }

    #[test]
    fn zero_min_free_slots_admits_full_handles() {
        assert!(can_admit(8, 8, 12, 0));
    }
}
