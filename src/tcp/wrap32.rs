use std::fmt;
use std::ops::Add;

/// A 32-bit sequence number that wraps around, relative to some zero point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Wrap32 {
    value: u32,
}

impl Wrap32 {
    const WRAP_SIZE: u64 = 1 << 32;
    const HIGH_MASK: u64 = !0xffff_ffff;

    pub fn new(value: u32) -> Self {
        Wrap32 { value }
    }

    pub fn raw_value(&self) -> u32 {
        self.value
    }

    /// Wrap an absolute sequence number `n` given the `zero_point` (the ISN)
    pub fn wrap(n: u64, zero_point: Wrap32) -> Self {
        zero_point + n as u32
    }

    /// Unwrap into the absolute sequence number closest to `checkpoint`
    pub fn unwrap(&self, zero_point: Wrap32, checkpoint: u64) -> u64 {
        let offset = self.value.wrapping_sub(zero_point.value) as u64;
        let candidate = (checkpoint & Self::HIGH_MASK) | offset;

        // Neighbours one period away; either may fall outside of u64
        let mut closest = candidate;
        for neighbour in [
            candidate.checked_sub(Self::WRAP_SIZE),
            candidate.checked_add(Self::WRAP_SIZE),
        ]
        .into_iter()
        .flatten()
        {
            if neighbour.abs_diff(checkpoint) < closest.abs_diff(checkpoint) {
                closest = neighbour;
            }
        }
        closest
    }
}

impl Add<u32> for Wrap32 {
    type Output = Wrap32;

    fn add(self, n: u32) -> Wrap32 {
        Wrap32::new(self.value.wrapping_add(n))
    }
}

impl fmt::Display for Wrap32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::Distribution;
    use rand::distributions::Uniform;
    use rand::Rng;
    use rayon::prelude::*;
    use rstest::rstest;

    // -- Test wrapping --

    #[test]
    fn test_wrap_zero_offset() {
        let wrapped = Wrap32::wrap(3 * (1u64 << 32), Wrap32::new(0));
        assert_eq!(wrapped, Wrap32::new(0));
    }

    #[test]
    fn test_wrap_positive_offset() {
        let wrapped = Wrap32::wrap(3 * (1u64 << 32) + 17, Wrap32::new(15));
        assert_eq!(wrapped, Wrap32::new(32));
    }

    #[test]
    fn test_wrap_negative_offset() {
        let wrapped = Wrap32::wrap(7 * (1u64 << 32) - 2, Wrap32::new(15));
        assert_eq!(wrapped, Wrap32::new(13));
    }

    #[test]
    fn test_wrap_u64_max() {
        let wrapped = Wrap32::wrap(u64::MAX, Wrap32::new(1));
        assert_eq!(wrapped, Wrap32::new(0));
    }

    // -- Test unwrapping --

    #[rstest]
    #[case::first_after_isn_zero(1, 0, 0, 1)]
    #[case::first_after_first_wraparound(1, 0, u32::MAX as u64, (1u64 << 32) + 1)]
    #[case::zero_just_past_wraparound(0, 0, (1u64 << 32) - 1, 1u64 << 32)]
    #[case::last_before_third_wraparound(u32::MAX - 1, 0, 3 * (1u64 << 32), 3 * (1u64 << 32) - 2)]
    #[case::tenth_before_third_wraparound(u32::MAX - 10, 0, 3 * (1u64 << 32), 3 * (1u64 << 32) - 11)]
    #[case::nonzero_isn(u32::MAX, 10, 3 * (1u64 << 32), 3 * (1u64 << 32) - 11)]
    #[case::max_value_zero_isn(u32::MAX, 0, 0, u32::MAX as u64)]
    #[case::value_equals_isn(16, 16, 0, 0)]
    #[case::max_value_nonzero_isn(15, 16, 0, u32::MAX as u64)]
    #[case::zero_with_large_isn(0, i32::MAX as u32, 0, (i32::MAX as u64) + 2)]
    #[case::max_with_max_isn(u32::MAX, i32::MAX as u32, 0, 1u64 << 31)]
    #[case::max_with_half_wrap_isn(u32::MAX, 1 << 31, 0, (u32::MAX as u64) >> 1)]
    fn test_unwrap(#[case] raw: u32, #[case] isn: u32, #[case] checkpoint: u64, #[case] expected: u64) {
        assert_eq!(Wrap32::new(raw).unwrap(Wrap32::new(isn), checkpoint), expected);
    }

    #[test]
    fn test_unwrap_near_u64_max_does_not_overflow() {
        let top = u64::MAX - 5;
        let isn = Wrap32::new(7);
        assert_eq!(Wrap32::wrap(top, isn).unwrap(isn, u64::MAX), top);
        assert_eq!(Wrap32::wrap(top, isn).unwrap(isn, top - 1000), top);
    }

    #[test]
    fn test_unwrap_prefers_lower_period_when_checkpoint_wraps() {
        // 2^32 - 1 is closer to the checkpoint than 2^33 - 1
        let unwrapped = Wrap32::new(u32::MAX).unwrap(Wrap32::new(0), 1u64 << 32);
        assert_eq!(unwrapped, (1u64 << 32) - 1);
    }

    // -- Test `+` operator overload --

    #[test]
    fn test_add() {
        assert_eq!(Wrap32::new(1) + 2, Wrap32::new(3));
    }

    #[test]
    fn test_add_overflow() {
        assert_eq!(Wrap32::new(u32::MAX) + 1, Wrap32::new(0));
    }

    // -- Test compare --

    #[test]
    fn test_equality_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..32768 {
            let n: u32 = rng.gen();
            let diff: u8 = rng.gen();
            let m = n.wrapping_add(diff as u32);

            assert_eq!(Wrap32::new(n) == Wrap32::new(m), n == m);
            assert_eq!(Wrap32::new(n) != Wrap32::new(m), n != m);
        }
    }

    // -- Test roundtrip --

    #[test]
    fn test_roundtrip_at_checkpoint() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let isn = Wrap32::new(rng.gen());
            let n: u64 = rng.gen();
            assert_eq!(Wrap32::wrap(n, isn).unwrap(isn, n), n);
        }
    }

    #[test]
    fn test_roundtrip() {
        fn check_roundtrip(isn: Wrap32, value: u64, checkpoint: u64) {
            assert_eq!(Wrap32::wrap(value, isn).unwrap(isn, checkpoint), value)
        }

        let n_reps = 100_000;
        let dist31minus1 = Uniform::from(0u32..=(1u32 << 31) - 1);
        let dist32 = Uniform::from(0u32..=u32::MAX);
        let big_offset: u64 = (1u64 << 31) - 1;
        let dist63 = Uniform::from(big_offset..=(1u64 << 63));

        (0..n_reps).into_par_iter().for_each(|_| {
            let mut rng = rand::thread_rng();
            let isn = Wrap32::new(dist32.sample(&mut rng));
            let val = dist63.sample(&mut rng);
            let offset = dist31minus1.sample(&mut rng) as u64;

            check_roundtrip(isn, val, val);
            check_roundtrip(isn, val + 1, val);
            check_roundtrip(isn, val - 1, val);
            check_roundtrip(isn, val + offset, val);
            check_roundtrip(isn, val - offset, val);
            check_roundtrip(isn, val + big_offset, val);
            check_roundtrip(isn, val - big_offset, val);
        });
    }
}
