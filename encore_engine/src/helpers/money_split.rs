use encore_common::Cents;

/// The platform's cut of every admitted request, in percent. The payee receives the rest.
pub const PLATFORM_COMMISSION_PERCENT: i64 = 15;

/// The fixed-rate division of a gross charge between the platform and the payee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSplit {
    pub gross_amount: Cents,
    pub platform_fee: Cents,
    pub payee_earnings: Cents,
}

/// Splits a gross amount into platform fee and payee earnings in integer cents.
///
/// The payee share is rounded down and the remainder is assigned to the platform fee, so the two parts always
/// reconstruct the gross amount exactly.
pub fn split_payment(gross_amount: Cents) -> PaymentSplit {
    let gross = gross_amount.value();
    let payee = gross * (100 - PLATFORM_COMMISSION_PERCENT) / 100;
    let fee = gross - payee;
    PaymentSplit {
        gross_amount,
        platform_fee: Cents::from(fee),
        payee_earnings: Cents::from(payee),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifty_rand_splits_into_7_50_and_42_50() {
        let split = split_payment(Cents::from_rands(50));
        assert_eq!(split.platform_fee, Cents::from(750));
        assert_eq!(split.payee_earnings, Cents::from(4250));
    }

    #[test]
    fn split_always_reconstructs_gross_exactly() {
        for gross in [1, 3, 7, 99, 100, 101, 1999, 2000, 5000, 123_456_789] {
            let split = split_payment(Cents::from(gross));
            assert_eq!(split.platform_fee + split.payee_earnings, Cents::from(gross), "gross = {gross}");
            assert!(split.platform_fee.value() >= 0);
            assert!(split.payee_earnings.value() >= 0);
        }
    }

    #[test]
    fn rounding_remainder_goes_to_the_platform() {
        // 101c * 85% = 85.85c. The payee gets 85c, the platform 16c.
        let split = split_payment(Cents::from(101));
        assert_eq!(split.payee_earnings, Cents::from(85));
        assert_eq!(split.platform_fee, Cents::from(16));
    }
}
