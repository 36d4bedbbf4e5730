use std::time::Duration;

/// Largest exponent applied to the base delay. Keeps the shift in range;
/// the multiplication itself saturates.
const MAX_EXPONENT: u32 = 31;

/// Returns the delay before reconnection attempt `attempt` (1-based).
///
/// Exponential backoff: `base * 2^(attempt - 1)`. Attempt 0 is treated as 1.
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    base.saturating_mul(1u32 << exponent)
}
