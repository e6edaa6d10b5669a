/// Simulation date in years. The only global mutable simulation-time state;
/// the run loop advances it when it pops the next event.
pub type WorldDate = i64;

/// Years per generation. Every rate in the group update cycle is expressed
/// per generation.
pub const GENERATION_SPAN: WorldDate = 20;

/// Largest date whose event ids still fit the `date * 1e9 + ...` layout.
pub const MAX_SUPPORTED_DATE: WorldDate = i64::MAX / 1_000_000_000 - 1;

/// Multiplier that places the trigger date in the most significant digits of
/// an event id.
pub const DATE_ID_FACTOR: i64 = 1_000_000_000;

/// Convert a fractional year offset into a schedulable date, or `None` when
/// the result would not be a valid future date.
pub fn date_after(current: WorldDate, span: f64) -> Option<WorldDate> {
    if !span.is_finite() || span < 0.0 {
        return None;
    }
    let target = current as f64 + span;
    if target > MAX_SUPPORTED_DATE as f64 {
        return None;
    }
    Some(target as WorldDate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_date_fits_event_id() {
        let id = MAX_SUPPORTED_DATE.checked_mul(DATE_ID_FACTOR);
        assert!(id.is_some());
        assert!(id.unwrap().checked_add(999_999_999).is_some());
    }

    #[test]
    fn date_after_rejects_overflow() {
        assert_eq!(date_after(100, 20.7), Some(120));
        assert_eq!(date_after(100, f64::INFINITY), None);
        assert_eq!(date_after(100, 1e30), None);
        assert_eq!(date_after(100, -1.0), None);
    }
}
