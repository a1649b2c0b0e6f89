use proptest::prelude::*;

use soldash_types::{Address, Amount, Signature, Timestamp};

proptest! {
    /// Display output parses back to the same amount.
    #[test]
    fn amount_display_parses_back(raw in 0u128..1_000_000_000_000_000_000u128, decimals in 0u8..=9) {
        let amount = Amount::from_raw(raw, decimals);
        let parsed = Amount::parse(&amount.to_string(), decimals).unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// a + b - b == a for same-scale amounts.
    #[test]
    fn amount_add_then_sub_is_identity(a in 0u64.., b in 0u64.., decimals in 0u8..=9) {
        let a = Amount::from_raw(a as u128, decimals);
        let b = Amount::from_raw(b as u128, decimals);
        let sum = a.checked_add(b).unwrap();
        prop_assert_eq!(sum.checked_sub(b), Some(a));
    }

    /// Subtraction never goes negative: it fails exactly when b > a.
    #[test]
    fn amount_sub_fails_iff_underflow(a in 0u64.., b in 0u64..) {
        let x = Amount::from_raw(a as u128, 6);
        let y = Amount::from_raw(b as u128, 6);
        prop_assert_eq!(x.checked_sub(y).is_none(), b > a);
    }

    /// Scaling up and back down is lossless.
    #[test]
    fn amount_rescale_up_down(raw in 0u64.., from in 0u8..=9, to in 0u8..=9) {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        let a = Amount::from_raw(raw as u128, lo);
        let up = a.rescale(hi).unwrap();
        prop_assert_eq!(up.rescale(lo).unwrap(), a);
    }

    /// Digest-derived addresses always validate.
    #[test]
    fn digest_addresses_are_valid(bytes in prop::array::uniform32(0u8..)) {
        let addr = Address::from_digest(&bytes);
        prop_assert!(Address::parse(addr.as_str()).is_ok());
    }

    /// Distinct digest inputs give distinct signatures.
    #[test]
    fn signature_digest_distinguishes_inputs(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
        prop_assume!(a != b);
        prop_assert_ne!(
            Signature::digest(&[a.as_bytes()]),
            Signature::digest(&[b.as_bytes()])
        );
    }

    /// Timestamp ordering follows the millisecond value.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::from_millis(a);
        let tb = Timestamp::from_millis(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }
}
