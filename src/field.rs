//! Binary field GF(2^m) — parameters, representation, utilities
//!
//! An element is a polynomial over GF(2) of degree < m, stored as a fixed
//! array of little-endian limbs ([`Fb`]). The field is described by a
//! [`FieldParams`] value carrying the extension degree, the sparse
//! irreducible polynomial f(x) = x^m + x^a (+ x^b + x^c) + 1, and the
//! algorithm selections resolved once at construction.
//!
//! ## Invariants
//!
//! - **Canonical elements.** Bits at positions ≥ m are zero in every `Fb`
//!   that crosses a public boundary. Reduction re-establishes the
//!   invariant after every product; shifts discard bits pushed past m−1.
//! - **Sparse modulus.** `b = c = 0` denotes a trinomial; otherwise
//!   a > b > c > 0. Quick reduction additionally relies on m − a being at
//!   least one limb, which holds for every shipped preset.
//! - **Variant dispatch.** Each operation with several implementations
//!   (multiply, square, reduce, invert) is routed through a selection tag
//!   chosen at construction; the named variants stay callable for
//!   cross-validation.
//!
//! Heavy arithmetic (multiplication, squaring, reduction, square root,
//! inversion) lives in [`crate::field_arith`]; this module owns the
//! representation and everything bit-level.

#![forbid(unsafe_code)]

use crate::digit;
use crate::rng::Prng;
use crate::{Digit, Error, Result, DIGIT, FB_LIMBS, FB_MAX_BITS};

/// An element of GF(2^m): little-endian limbs, bits ≥ m clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fb(pub(crate) [Digit; FB_LIMBS]);

impl Default for Fb {
    fn default() -> Self {
        Fb([0; FB_LIMBS])
    }
}

impl Fb {
    /// The zero polynomial.
    pub const ZERO: Fb = Fb([0; FB_LIMBS]);

    /// The constant polynomial 1.
    pub const ONE: Fb = {
        let mut limbs = [0; FB_LIMBS];
        limbs[0] = 1;
        Fb(limbs)
    };

    /// Element holding a single digit in its lowest limb.
    #[inline]
    pub const fn from_digit(d: Digit) -> Fb {
        let mut limbs = [0; FB_LIMBS];
        limbs[0] = d;
        Fb(limbs)
    }

    /// True iff every limb is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&d| d == 0)
    }

    /// Borrow the raw limbs (little-endian).
    #[inline]
    pub fn limbs(&self) -> &[Digit; FB_LIMBS] {
        &self.0
    }
}

/// Which multiplication routine [`FieldParams::mul`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulAlg {
    /// Bit-at-a-time shift-and-add.
    Basic,
    /// Width-4 López–Dahab comb with 16 precomputed multiples.
    Comb,
    /// One-level Karatsuba over the half-way limb boundary.
    Karat,
    /// Comb fused with quick reduction.
    Integ,
}

/// Which squaring routine [`FieldParams::sqr`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqrAlg {
    /// Bit-spread into even positions.
    Basic,
    /// 256-entry byte-spread table.
    Table,
    /// Table spread fused with quick reduction.
    Integ,
}

/// Which inversion routine [`FieldParams::inv`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvAlg {
    /// Fermat: a^(2^m − 2) by a square-and-multiply chain.
    Basic,
    /// Polynomial extended Euclid.
    Exgcd,
    /// Almost Inverse with a final x^k correction.
    Almos,
}

/// Which reduction routine products are folded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdcAlg {
    /// Bit-at-a-time modular fold.
    Basic,
    /// Digit-aligned sparse folding (trinomial/pentanomial only).
    Quick,
}

/// Which square-root routine [`crate::field_arith`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrtAlg {
    /// a^(2^(m−1)) by repeated squaring.
    Basic,
    /// Even/odd split with sparse shifts. Valid only when every modulus
    /// exponent is odd, so that √x = x^((m+1)/2) + x^((a+1)/2) (+ …).
    Quick,
}

/// Parameters of one binary field, fixed at construction.
#[derive(Debug, Clone)]
pub struct FieldParams {
    /// Extension degree m.
    pub m: usize,
    /// Active limbs: ⌈m / DIGIT⌉.
    pub limbs: usize,
    /// Exponent of the middle term x^a.
    pub fa: usize,
    /// Exponent of x^b, 0 for a trinomial.
    pub fb: usize,
    /// Exponent of x^c, 0 for a trinomial.
    pub fc: usize,
    /// Full modulus f(x), including the x^m term.
    pub(crate) modulus: [Digit; FB_LIMBS],
    /// Multiplication selection.
    pub mul_alg: MulAlg,
    /// Squaring selection.
    pub sqr_alg: SqrAlg,
    /// Inversion selection.
    pub inv_alg: InvAlg,
    /// Reduction selection.
    pub rdc_alg: RdcAlg,
    /// Square-root selection.
    pub srt_alg: SrtAlg,
}

impl FieldParams {
    /// Configure GF(2^m) with modulus x^m + x^a (+ x^b + x^c) + 1.
    ///
    /// `b = c = 0` selects a trinomial. Degrees beyond the build capacity
    /// are a precision error; malformed exponent tuples are invalid.
    pub fn new(m: usize, a: usize, b: usize, c: usize) -> Result<Self> {
        if m > FB_MAX_BITS {
            return Err(Error::PrecisionExceeded {
                degree: m,
                max: FB_MAX_BITS,
            });
        }
        if m < 2 || a == 0 || a >= m {
            return Err(Error::Invalid("malformed field polynomial"));
        }
        let penta = b != 0 || c != 0;
        if penta && !(a > b && b > c && c > 0) {
            return Err(Error::Invalid("pentanomial exponents must satisfy a > b > c > 0"));
        }

        let mut modulus = [0; FB_LIMBS];
        let mut set = |pos: usize| {
            let (limb, off) = digit::split(pos);
            modulus[limb] |= 1 << off;
        };
        set(0);
        set(a);
        set(m);
        if penta {
            set(b);
            set(c);
        }

        // Quick reduction folds whole limbs; it needs the x^a term to land
        // strictly below the limb being folded.
        let rdc_alg = if m - a >= DIGIT { RdcAlg::Quick } else { RdcAlg::Basic };
        // The sparse square root needs every exponent odd.
        let odd = |e: usize| e % 2 == 1;
        let srt_alg = if odd(m) && odd(a) && (!penta || (odd(b) && odd(c))) {
            SrtAlg::Quick
        } else {
            SrtAlg::Basic
        };

        Ok(FieldParams {
            m,
            limbs: (m + DIGIT - 1) / DIGIT,
            fa: a,
            fb: b,
            fc: c,
            modulus,
            mul_alg: MulAlg::Comb,
            sqr_alg: SqrAlg::Table,
            inv_alg: InvAlg::Exgcd,
            rdc_alg,
            srt_alg,
        })
    }

    /// True iff the modulus is a trinomial.
    #[inline]
    pub fn is_trinomial(&self) -> bool {
        self.fb == 0
    }

    /// Bytes in the canonical big-endian serialization: ⌈m/8⌉.
    #[inline]
    pub fn serialized_len(&self) -> usize {
        (self.m + 7) / 8
    }

    /// Mask for the topmost active limb.
    #[inline]
    pub(crate) fn top_mask(&self) -> Digit {
        let r = self.m & (DIGIT - 1);
        if r == 0 {
            Digit::MAX
        } else {
            (1 << r) - 1
        }
    }

    // ------------------------------------------------------------------
    // Addition and bit utilities
    // ------------------------------------------------------------------

    /// c = a + b (XOR of limb vectors; addition and subtraction coincide).
    #[inline]
    pub fn add(&self, a: &Fb, b: &Fb) -> Fb {
        let mut c = *a;
        for i in 0..self.limbs {
            c.0[i] ^= b.0[i];
        }
        c
    }

    /// a + d where d is a single-digit polynomial (XOR into limb 0).
    #[inline]
    pub fn add_digit(&self, a: &Fb, d: Digit) -> Fb {
        let mut c = *a;
        c.0[0] ^= d;
        c
    }

    /// Position of the highest set bit plus one; 0 for the zero element.
    pub fn bits(&self, a: &Fb) -> usize {
        for i in (0..self.limbs).rev() {
            if a.0[i] != 0 {
                return i * DIGIT + digit::bits(a.0[i]);
            }
        }
        0
    }

    /// Coefficient of x^i. Indices ≥ m are invalid.
    pub fn test_bit(&self, a: &Fb, i: usize) -> Result<bool> {
        if i >= self.m {
            return Err(Error::Invalid("bit index out of range"));
        }
        let (limb, off) = digit::split(i);
        Ok((a.0[limb] >> off) & 1 == 1)
    }

    /// Copy of `a` with the coefficient of x^i forced to `v`.
    pub fn set_bit(&self, a: &Fb, i: usize, v: bool) -> Result<Fb> {
        if i >= self.m {
            return Err(Error::Invalid("bit index out of range"));
        }
        let (limb, off) = digit::split(i);
        let mut c = *a;
        if v {
            c.0[limb] |= 1 << off;
        } else {
            c.0[limb] &= !(1 << off);
        }
        Ok(c)
    }

    /// Logical left shift by k; bits pushed to positions ≥ m are discarded.
    ///
    /// Shifts by at least one limb dispatch the digit-stride path first.
    pub fn lsh(&self, a: &Fb, k: usize) -> Result<Fb> {
        if k >= self.m {
            return Err(Error::Invalid("shift amount reaches field width"));
        }
        let (stride, off) = digit::split(k);
        let mut c = Fb::ZERO;
        if off == 0 {
            for i in (stride..self.limbs).rev() {
                c.0[i] = a.0[i - stride];
            }
        } else {
            for i in (stride..self.limbs).rev() {
                c.0[i] = a.0[i - stride] << off;
                if i > stride {
                    c.0[i] |= a.0[i - stride - 1] >> (DIGIT - off);
                }
            }
        }
        c.0[self.limbs - 1] &= self.top_mask();
        Ok(c)
    }

    /// Logical right shift by k.
    pub fn rsh(&self, a: &Fb, k: usize) -> Result<Fb> {
        if k >= self.m {
            return Err(Error::Invalid("shift amount reaches field width"));
        }
        let (stride, off) = digit::split(k);
        let mut c = Fb::ZERO;
        if off == 0 {
            for i in 0..self.limbs - stride {
                c.0[i] = a.0[i + stride];
            }
        } else {
            for i in 0..self.limbs - stride {
                c.0[i] = a.0[i + stride] >> off;
                if i + stride + 1 < self.limbs {
                    c.0[i] |= a.0[i + stride + 1] << (DIGIT - off);
                }
            }
        }
        Ok(c)
    }

    // ------------------------------------------------------------------
    // Randomization, traces
    // ------------------------------------------------------------------

    /// Uniform element: fresh bytes in every limb, bits ≥ m masked off.
    pub fn rand(&self, rng: &mut Prng) -> Fb {
        let mut c = Fb::ZERO;
        for i in 0..self.limbs {
            c.0[i] = rng.next_digit();
        }
        c.0[self.limbs - 1] &= self.top_mask();
        c
    }

    /// Absolute trace Tr(a) = Σ a^(2^i), which is 0 or 1.
    pub fn trace(&self, a: &Fb) -> Digit {
        let mut acc = *a;
        let mut t = *a;
        for _ in 1..self.m {
            t = self.sqr(&t);
            acc = self.add(&acc, &t);
        }
        acc.0[0] & 1
    }

    /// Solve y² + y = c by half-trace (m odd); `None` when Tr(c) = 1.
    pub fn quad_solve(&self, c: &Fb) -> Option<Fb> {
        debug_assert!(self.m % 2 == 1, "half-trace solver assumes odd m");
        let mut acc = *c;
        let mut t = *c;
        for _ in 0..(self.m - 1) / 2 {
            t = self.sqr(&self.sqr(&t));
            acc = self.add(&acc, &t);
        }
        // For odd m: H(c)² + H(c) = c + Tr(c), so the check is exact.
        let check = self.add(&self.sqr(&acc), &acc);
        if check == *c {
            Some(acc)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Write the canonical big-endian encoding (⌈m/8⌉ bytes, left-padded).
    pub fn write_bytes(&self, a: &Fb, out: &mut [u8]) -> Result<()> {
        let need = self.serialized_len();
        if out.len() < need {
            return Err(Error::BufferTooSmall {
                need,
                got: out.len(),
            });
        }
        for (i, slot) in out[..need].iter_mut().enumerate() {
            let byte_idx = need - 1 - i;
            let (limb, off) = (byte_idx / (DIGIT / 8), (byte_idx % (DIGIT / 8)) * 8);
            *slot = (a.0[limb] >> off) as u8;
        }
        Ok(())
    }

    /// Read the canonical big-endian encoding produced by `write_bytes`.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<Fb> {
        let need = self.serialized_len();
        if bytes.len() != need {
            return Err(Error::Invalid("field element encoding has wrong length"));
        }
        let mut c = Fb::ZERO;
        for (i, &byte) in bytes.iter().enumerate() {
            let byte_idx = need - 1 - i;
            let (limb, off) = (byte_idx / (DIGIT / 8), (byte_idx % (DIGIT / 8)) * 8);
            c.0[limb] |= (byte as Digit) << off;
        }
        if c.0[self.limbs - 1] & !self.top_mask() != 0 {
            return Err(Error::Invalid("field element encoding exceeds degree"));
        }
        for &l in &c.0[self.limbs..] {
            if l != 0 {
                return Err(Error::Invalid("field element encoding exceeds degree"));
            }
        }
        Ok(c)
    }

    /// Radix-16 rendering of the canonical byte encoding.
    pub fn write_hex(&self, a: &Fb) -> String {
        let mut buf = vec![0u8; self.serialized_len()];
        self.write_bytes(a, &mut buf)
            .expect("buffer sized to serialized_len");
        hex::encode(buf)
    }

    /// Parse the radix-16 rendering produced by `write_hex`.
    pub fn read_hex(&self, s: &str) -> Result<Fb> {
        let bytes = hex::decode(s).map_err(|_| Error::Invalid("malformed hex string"))?;
        self.read_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Prng;

    fn f163() -> FieldParams {
        FieldParams::new(163, 7, 6, 3).unwrap()
    }

    fn f233() -> FieldParams {
        FieldParams::new(233, 74, 0, 0).unwrap()
    }

    #[test]
    fn construction_validates() {
        assert!(FieldParams::new(163, 7, 6, 3).is_ok());
        assert!(FieldParams::new(233, 74, 0, 0).is_ok());
        assert!(matches!(
            FieldParams::new(2000, 7, 0, 0),
            Err(Error::PrecisionExceeded { degree: 2000, .. })
        ));
        assert!(FieldParams::new(163, 0, 0, 0).is_err());
        assert!(FieldParams::new(163, 3, 7, 5).is_err());
    }

    #[test]
    fn modulus_bits_are_exact() {
        let f = f163();
        let want = [163usize, 7, 6, 3, 0];
        for pos in want {
            let (limb, off) = crate::digit::split(pos);
            assert_eq!((f.modulus[limb] >> off) & 1, 1, "bit {pos}");
        }
        let mut count = 0;
        for limb in f.modulus {
            count += limb.count_ones();
        }
        assert_eq!(count, 5);

        let t = f233();
        let mut count = 0;
        for limb in t.modulus {
            count += limb.count_ones();
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn addition_is_involutive() {
        let f = f163();
        let mut rng = Prng::from_seed(b"field-add");
        for _ in 0..50 {
            let a = f.rand(&mut rng);
            let b = f.rand(&mut rng);
            // (a + b) + a = b
            assert_eq!(f.add(&f.add(&a, &b), &a), b);
            assert_eq!(f.add(&a, &Fb::ZERO), a);
        }
    }

    #[test]
    fn shifts_roundtrip_below_the_top() {
        let f = f233();
        let mut rng = Prng::from_seed(b"field-shift");
        for k in [1usize, 7, 63, 64, 65, 130] {
            let a = f.rand(&mut rng);
            let down_up = f.lsh(&f.rsh(&a, k).unwrap(), k).unwrap();
            // Shifting down then up clears the low k bits but nothing else.
            let mut expect = a;
            for i in 0..k {
                expect = f.set_bit(&expect, i, false).unwrap();
            }
            assert_eq!(down_up, expect, "k = {k}");
        }
        assert!(f.lsh(&Fb::ONE, 233).is_err());
        assert!(f.rsh(&Fb::ONE, 400).is_err());
    }

    #[test]
    fn bit_accessors_agree_with_bits() {
        let f = f163();
        let a = f.lsh(&Fb::ONE, 100).unwrap();
        assert_eq!(f.bits(&a), 101);
        assert!(f.test_bit(&a, 100).unwrap());
        assert!(!f.test_bit(&a, 99).unwrap());
        assert!(f.test_bit(&a, 163).is_err());
        let cleared = f.set_bit(&a, 100, false).unwrap();
        assert!(cleared.is_zero());
    }

    #[test]
    fn random_elements_respect_the_degree() {
        let f = f163();
        let mut rng = Prng::from_seed(b"field-rand");
        for _ in 0..100 {
            let a = f.rand(&mut rng);
            assert!(f.bits(&a) <= 163);
        }
    }

    #[test]
    fn byte_and_hex_roundtrip() {
        let f = f233();
        let mut rng = Prng::from_seed(b"field-io");
        for _ in 0..20 {
            let a = f.rand(&mut rng);
            let mut buf = vec![0u8; f.serialized_len()];
            f.write_bytes(&a, &mut buf).unwrap();
            assert_eq!(f.read_bytes(&buf).unwrap(), a);
            let s = f.write_hex(&a);
            assert_eq!(f.read_hex(&s).unwrap(), a);
        }
        let mut short = [0u8; 4];
        assert!(matches!(
            f.write_bytes(&Fb::ONE, &mut short),
            Err(Error::BufferTooSmall { .. })
        ));
    }
}
