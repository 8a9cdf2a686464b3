//! Pool-specific error types.

use thiserror::Error;

/// Errors returned by `confirm`.
///
/// Each variant maps one-to-one onto a wire failure code so callers can
/// decide whether to request a fresh lease.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    /// The handle has no entry, no lease, or is leased to a different
    /// holder. A retrying caller with a stale identity must not disturb the
    /// current holder's lease.
    #[error("no lock held on this handle by this holder")]
    NoLockOrWrongBot,

    /// The lease's absolute lifetime cap elapsed; the lease has been
    /// terminated regardless of its renewed expiry.
    #[error("heartbeat window expired; lease terminated")]
    HeartbeatWindowExpired,
}

impl ConfirmError {
    /// Stable wire code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoLockOrWrongBot => "no_lock_or_wrong_bot",
            Self::HeartbeatWindowExpired => "heartbeat_window_expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(ConfirmError::NoLockOrWrongBot.code(), "no_lock_or_wrong_bot");
        assert_eq!(
            ConfirmError::HeartbeatWindowExpired.code(),
            "heartbeat_window_expired"
        );
    }
}
