use crate::SupernodeTimeouts;
use std::time::Duration;

const BYTES_PER_MIB: u64 = 1024 * 1024;
const MIB_PER_STEP: u64 = 100;

/// Timeout for a pin call carrying `size_hint_bytes` of content:
/// `min(max, base + ceil(size_mib / 100) * step)`.
///
/// An unknown size yields the base timeout. That also means an object whose
/// size lookup failed earlier gets the minimal timeout even if it is large;
/// the migration retry path covers the case where that proves too short.
pub fn pin_timeout(size_hint_bytes: Option<u64>, timeouts: &SupernodeTimeouts) -> Duration {
    let size_mib = size_hint_bytes.unwrap_or(0).div_ceil(BYTES_PER_MIB);
    let steps = size_mib.div_ceil(MIB_PER_STEP);
    let secs = timeouts
        .base_secs
        .saturating_add(steps.saturating_mul(timeouts.step_secs))
        .min(timeouts.max_secs);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * MIB;

    fn timeouts() -> SupernodeTimeouts {
        SupernodeTimeouts {
            base_secs: 120,
            step_secs: 60,
            max_secs: 3600,
        }
    }

    fn secs(size: u64) -> u64 {
        pin_timeout(Some(size), &timeouts()).as_secs()
    }

    #[test]
    fn scales_with_size() {
        assert_eq!(secs(10 * MIB), 120 + 60); // 1 step
        assert_eq!(secs(100 * MIB), 120 + 60); // still 1 step
        assert_eq!(secs(500 * MIB), 120 + 5 * 60);
        assert_eq!(secs(GIB), 120 + 11 * 60); // 1024 MiB -> 11 steps
        assert_eq!(secs(5 * GIB), 120 + 52 * 60); // 5120 MiB -> 52 steps
    }

    #[test]
    fn caps_at_max() {
        // 50 GiB would want 120 + 512 * 60 seconds
        assert_eq!(secs(50 * GIB), 3600);
    }

    #[test]
    fn unknown_or_zero_size_gets_base() {
        assert_eq!(pin_timeout(None, &timeouts()).as_secs(), 120);
        assert_eq!(secs(0), 120);
    }
}
