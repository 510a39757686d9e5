//! Commission split arithmetic.
//!
//! All amounts are integer minor currency units; no floating point is
//! involved anywhere. The commission rounds half up, and the technician net
//! is the exact remainder, so the two parts always sum to the job amount.

use crate::error::CoreError;
use crate::types::MinorUnits;

/// Result of splitting a job amount between platform and technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarningsSplit {
    /// Platform commission in minor units, rounded half up.
    pub commission_minor: MinorUnits,
    /// Technician net in minor units; always `amount - commission`.
    pub net_minor: MinorUnits,
}

/// Split `amount_minor` at `commission_percent`.
///
/// `commission = round_half_up(amount * percent / 100)`. The percent is the
/// value in effect at claim time; callers snapshot the result into an
/// earnings record so later rate changes never touch a settled job.
pub fn split(amount_minor: MinorUnits, commission_percent: u8) -> Result<EarningsSplit, CoreError> {
    if commission_percent > 100 {
        return Err(CoreError::Validation(format!(
            "commission percent must be within 0..=100, got {commission_percent}"
        )));
    }
    if amount_minor < 0 {
        return Err(CoreError::Validation(format!(
            "job amount must not be negative, got {amount_minor}"
        )));
    }

    let commission_minor = (amount_minor * commission_percent as i64 + 50) / 100;
    Ok(EarningsSplit {
        commission_minor,
        net_minor: amount_minor - commission_minor,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::CoreError;

    #[test]
    fn reference_scenario_1000_at_30_percent() {
        let s = split(1000, 30).unwrap();
        assert_eq!(s.commission_minor, 300);
        assert_eq!(s.net_minor, 700);
    }

    #[test]
    fn rounds_half_up() {
        // 1001 * 30 / 100 = 300.3 -> 300
        assert_eq!(split(1001, 30).unwrap().commission_minor, 300);
        // 1005 * 30 / 100 = 301.5 -> 302
        assert_eq!(split(1005, 30).unwrap().commission_minor, 302);
        // 50 * 1 / 100 = 0.5 -> 1
        assert_eq!(split(50, 1).unwrap().commission_minor, 1);
        // 49 * 1 / 100 = 0.49 -> 0
        assert_eq!(split(49, 1).unwrap().commission_minor, 0);
    }

    #[test]
    fn parts_always_sum_to_amount() {
        for amount in 0..=2500 {
            for percent in 0..=100u8 {
                let s = split(amount, percent).unwrap();
                assert_eq!(
                    s.commission_minor + s.net_minor,
                    amount,
                    "amount={amount} percent={percent}"
                );
                assert!(s.commission_minor >= 0);
                assert!(s.net_minor >= 0);
            }
        }
    }

    #[test]
    fn boundary_percents() {
        let zero = split(1234, 0).unwrap();
        assert_eq!(zero.commission_minor, 0);
        assert_eq!(zero.net_minor, 1234);

        let all = split(1234, 100).unwrap();
        assert_eq!(all.commission_minor, 1234);
        assert_eq!(all.net_minor, 0);
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        assert_matches!(split(1000, 101), Err(CoreError::Validation(_)));
        assert_matches!(split(-1, 30), Err(CoreError::Validation(_)));
    }
}
