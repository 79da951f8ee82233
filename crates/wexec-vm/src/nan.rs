//! NaN bit-pattern policy.
//!
//! The numeric specification leaves the payload of a freshly generated
//! NaN unconstrained; this policy decides which bit pattern is observable.
//! The evaluator routes every NaN arithmetic result through
//! [`NanBits::transform_f32`]/[`NanBits::transform_f64`], keeping the
//! arithmetic code policy-agnostic.

use std::fmt;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

// Exponent all-ones plus the quiet bit, so the synthesized pattern is a
// NaN for every kind, never an infinity.
const QUIET_F32: u32 = 0x7FC0_0000;
const QUIET_F64: u64 = 0x7FF8_0000_0000_0000;

/// Strategy for choosing an otherwise-unspecified NaN bit pattern.
/// Immutable after construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NanKind {
    /// Payload and sign bits are all zero.
    Canonical,
    /// Payload and sign bits are all one.
    Inverse,
    /// Payload and sign bits are drawn uniformly at random.
    Random,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown NaN kind `{0}` (expected canonical, inverse, or random)")]
pub struct ParseNanKindError(String);

impl FromStr for NanKind {
    type Err = ParseNanKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical" => Ok(NanKind::Canonical),
            "inverse" => Ok(NanKind::Inverse),
            "random" => Ok(NanKind::Random),
            other => Err(ParseNanKindError(other.to_string())),
        }
    }
}

impl fmt::Display for NanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NanKind::Canonical => "canonical",
            NanKind::Inverse => "inverse",
            NanKind::Random => "random",
        };
        f.write_str(name)
    }
}

/// Stateful NaN policy. One instance per execution session; the random
/// state is private and must not be shared across threads.
#[derive(Debug)]
pub struct NanBits {
    kind: NanKind,
    propagating: bool,
    rng: SmallRng,
}

impl NanBits {
    pub fn new(kind: NanKind) -> Self {
        Self {
            kind,
            propagating: false,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn kind(&self) -> NanKind {
        self.kind
    }

    /// Whether input NaNs are passed through bit-for-bit by the transform.
    pub fn propagating(&self) -> bool {
        self.propagating
    }

    pub fn set_propagating(&mut self, on: bool) {
        self.propagating = on;
    }

    /// Synthesize a quiet float32 NaN per the policy kind.
    pub fn get_f32(&mut self) -> f32 {
        let mut bits: u32 = match self.kind {
            NanKind::Canonical => 0,
            NanKind::Inverse => !0,
            NanKind::Random => self.rng.gen(),
        };
        bits |= QUIET_F32;
        f32::from_bits(bits)
    }

    /// Synthesize a quiet float64 NaN per the policy kind.
    pub fn get_f64(&mut self) -> f64 {
        let mut bits: u64 = match self.kind {
            NanKind::Canonical => 0,
            NanKind::Inverse => !0,
            NanKind::Random => self.rng.gen(),
        };
        bits |= QUIET_F64;
        f64::from_bits(bits)
    }

    /// Replace a NaN result with the policy's pattern, unless propagating.
    pub fn transform_f32(&mut self, old: f32) -> f32 {
        if self.propagating {
            return old;
        }
        self.get_f32()
    }

    /// Replace a NaN result with the policy's pattern, unless propagating.
    pub fn transform_f64(&mut self, old: f64) -> f64 {
        if self.propagating {
            return old;
        }
        self.get_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_has_zero_payload_and_sign() {
        let mut nan = NanBits::new(NanKind::Canonical);
        assert_eq!(nan.get_f32().to_bits(), QUIET_F32);
        assert_eq!(nan.get_f64().to_bits(), QUIET_F64);
    }

    #[test]
    fn inverse_has_all_one_payload_and_sign() {
        let mut nan = NanBits::new(NanKind::Inverse);
        assert_eq!(nan.get_f32().to_bits(), u32::MAX);
        assert_eq!(nan.get_f64().to_bits(), u64::MAX);
        assert!(nan.get_f32().is_nan());
        assert!(nan.get_f64().is_nan());
    }

    #[test]
    fn random_is_always_a_nan() {
        let mut nan = NanBits::new(NanKind::Random);
        for _ in 0..256 {
            let f = nan.get_f32();
            assert!(f.is_nan());
            assert_eq!(f.to_bits() & QUIET_F32, QUIET_F32);
            let d = nan.get_f64();
            assert!(d.is_nan());
            assert_eq!(d.to_bits() & QUIET_F64, QUIET_F64);
        }
    }

    #[test]
    fn propagating_passes_input_through_bit_identical() {
        let mut nan = NanBits::new(NanKind::Canonical);
        nan.set_propagating(true);

        let odd = f32::from_bits(0xFFC1_2345);
        assert_eq!(nan.transform_f32(odd).to_bits(), odd.to_bits());
        let odd64 = f64::from_bits(0x7FF8_DEAD_BEEF_0001);
        assert_eq!(nan.transform_f64(odd64).to_bits(), odd64.to_bits());
    }

    #[test]
    fn non_propagating_substitutes_the_policy_pattern() {
        let mut nan = NanBits::new(NanKind::Canonical);
        let odd = f32::from_bits(0xFFC1_2345);
        assert_eq!(nan.transform_f32(odd).to_bits(), QUIET_F32);
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("canonical".parse::<NanKind>(), Ok(NanKind::Canonical));
        assert_eq!("inverse".parse::<NanKind>(), Ok(NanKind::Inverse));
        assert_eq!("random".parse::<NanKind>(), Ok(NanKind::Random));
        assert!("quiet".parse::<NanKind>().is_err());
    }
}
