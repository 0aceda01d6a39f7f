//! Scalar collaborator and signed-digit recodings
//!
//! The curve layer consumes variable-precision integers through the narrow
//! surface of [`Scalar`]: size in bits, bit test, big-endian bytes, modular
//! reduction, uniform sampling, and the signed-digit recodings the
//! multipliers run on. The representation behind that surface is
//! `num-bigint`; nothing in the toolkit peeks inside it.
//!
//! Koblitz curves additionally get the τ-adic machinery: the Lucas
//! sequences that pin down the curve order and the partial-reduction
//! constants (vm, s0, s1), partial reduction modulo δ = (τ^m − 1)/(τ − 1),
//! and the τ-NAF / width-w τ-NAF digit generators. The constants are
//! derived at parameter-set time from the Lucas recurrences rather than
//! stored as per-curve blobs.
//!
//! Digit conventions: every recoding returns digits **least-significant
//! first**; nonzero digits are odd and bounded by 2^(w−1).

#![forbid(unsafe_code)]

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::rng::Prng;
use crate::{Error, Result};

/// An unsigned variable-precision scalar (opaque bignum collaborator).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Scalar(BigUint);

impl Scalar {
    /// The zero scalar.
    pub fn zero() -> Self {
        Scalar(BigUint::zero())
    }

    /// Scalar from a machine word.
    pub fn from_u64(v: u64) -> Self {
        Scalar(BigUint::from(v))
    }

    /// True iff the scalar is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Size in bits (0 for zero).
    pub fn bits(&self) -> usize {
        self.0.bits() as usize
    }

    /// Test bit i (false beyond the top).
    pub fn bit(&self, i: usize) -> bool {
        self.0.bit(i as u64)
    }

    /// Parse a big-endian byte string.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Scalar(BigUint::from_bytes_be(bytes))
    }

    /// Canonical big-endian bytes (no padding, empty for zero).
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// Parse a radix-16 string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::Invalid("malformed hex scalar"))?;
        Ok(Self::from_bytes_be(&bytes))
    }

    /// self mod n.
    pub fn reduce(&self, n: &Scalar) -> Scalar {
        Scalar(&self.0 % &n.0)
    }

    /// self + other.
    pub fn add(&self, other: &Scalar) -> Scalar {
        Scalar(&self.0 + &other.0)
    }

    /// self · other.
    pub fn mul(&self, other: &Scalar) -> Scalar {
        Scalar(&self.0 * &other.0)
    }

    /// Uniform sample in [0, 2^b).
    pub fn rand_bits(b: usize, rng: &mut Prng) -> Scalar {
        let mut buf = vec![0u8; (b + 7) / 8];
        rng.fill(&mut buf);
        if b % 8 != 0 {
            buf[0] &= (1u8 << (b % 8)) - 1;
        }
        Scalar(BigUint::from_bytes_be(&buf))
    }

    /// Uniform sample in [0, n): oversample by 128 bits, then reduce.
    pub fn rand_mod(n: &Scalar, rng: &mut Prng) -> Scalar {
        let wide = Self::rand_bits(n.bits() + 128, rng);
        wide.reduce(n)
    }

    /// Width-w NAF, least-significant digit first; nonzero digits are odd
    /// with |d| < 2^(w−1). `w = 2` is the classic NAF.
    pub fn naf(&self, w: u32) -> Vec<i8> {
        debug_assert!((2..=8).contains(&w));
        let modulus = 1i64 << w;
        let half = 1i64 << (w - 1);
        let mut k = BigInt::from(self.0.clone());
        let mut digits = Vec::with_capacity(self.bits() + 1);
        while !k.is_zero() {
            if k.is_odd() {
                let mut u = (&k % modulus).to_i64().expect("residue fits");
                if u >= half {
                    u -= modulus;
                }
                k -= BigInt::from(u);
                digits.push(u as i8);
            } else {
                digits.push(0);
            }
            k >>= 1;
        }
        digits
    }

    /// Joint Sparse Form of (self, other), least-significant first.
    ///
    /// At most half of the digit pairs are jointly nonzero, which is what
    /// the simultaneous multiplier exploits.
    pub fn jsf(&self, other: &Scalar) -> Vec<(i8, i8)> {
        let mut k = [BigInt::from(self.0.clone()), BigInt::from(other.0.clone())];
        let mut digits = Vec::with_capacity(self.bits().max(other.bits()) + 1);
        while !k[0].is_zero() || !k[1].is_zero() {
            let mut u = [0i8; 2];
            for i in 0..2 {
                if k[i].is_odd() {
                    let r4 = (&k[i] % 4i32 + 4i32) % 4i32;
                    let mut ui: i8 = if r4 == BigInt::from(1) { 1 } else { -1 };
                    let r8 = (&k[i] % 8i32 + 8i32) % 8i32;
                    let other_r4 = (&k[1 - i] % 4i32 + 4i32) % 4i32;
                    if (r8 == BigInt::from(3) || r8 == BigInt::from(5))
                        && other_r4 == BigInt::from(2)
                    {
                        ui = -ui;
                    }
                    u[i] = ui;
                }
            }
            for i in 0..2 {
                k[i] -= BigInt::from(u[i]);
                k[i] >>= 1;
            }
            digits.push((u[0], u[1]));
        }
        digits
    }
}

// ---------------------------------------------------------------------------
// Koblitz τ-adic machinery
// ---------------------------------------------------------------------------

/// τ-adic context of one Koblitz curve: τ² = μτ − 2 with μ = (−1)^(1−a).
///
/// Carries the derived curve order, cofactor, and the partial-reduction
/// constants (vm, s0, s1) with δ = s0 + s1·τ = (τ^m − 1)/(τ − 1).
#[derive(Debug, Clone)]
pub struct TauCtx {
    /// μ ∈ {−1, +1}.
    pub mu: i8,
    /// Extension degree m.
    pub m: usize,
    /// Lucas term V_m; the full curve order is 2^m + 1 − V_m.
    pub vm: BigInt,
    /// δ component s0.
    pub s0: BigInt,
    /// δ component s1.
    pub s1: BigInt,
    /// Prime subgroup order n = (2^m + 1 − V_m) / h.
    pub n: Scalar,
    /// Cofactor h (2 when μ = 1, 4 when μ = −1).
    pub h: u32,
}

impl TauCtx {
    /// Derive the τ-adic context for GF(2^m) and curve coefficient a ∈ {0,1}.
    pub fn new(m: usize, a: u32) -> Self {
        let mu: i64 = if a == 1 { 1 } else { -1 };
        // Lucas sequences: U_{k+1} = μU_k − 2U_{k−1}, V likewise.
        let mut u_prev = BigInt::zero();
        let mut u_cur = BigInt::one();
        let mut v_prev = BigInt::from(2);
        let mut v_cur = BigInt::from(mu);
        for _ in 1..m {
            let u_next = &u_cur * mu - &u_prev * 2;
            u_prev = u_cur;
            u_cur = u_next;
            let v_next = &v_cur * mu - &v_prev * 2;
            v_prev = v_cur;
            v_cur = v_next;
        }
        let (um, um1, vm) = (u_cur, u_prev, v_cur);

        let h: i32 = if mu == 1 { 2 } else { 4 };
        // τ^m − 1 = (−2·U_{m−1} − 1) + U_m·τ; divide by τ − 1 via its
        // conjugate (μ − 1) − τ and the norm h = 3 − μ.
        let x = &um1 * (-2) - 1;
        let y = um;
        let s0 = (&x * (mu - 1) + &y * 2) / h;
        let s1 = (-&x - &y) / h;

        let order: BigInt = (BigInt::one() << m) + 1 - &vm;
        let n = (&order / h).to_biguint().expect("positive order");

        TauCtx {
            mu: mu as i8,
            m,
            vm,
            s0,
            s1,
            n: Scalar(n),
            h: h as u32,
        }
    }

    /// Partially reduce k modulo δ: the returned (r0, r1) satisfies
    /// (r0 + r1·τ)·P = k·P for every P in the order-n subgroup, with both
    /// components near √n in size.
    pub fn partial_reduce(&self, k: &Scalar) -> (BigInt, BigInt) {
        let n = BigInt::from(self.n.0.clone());
        let k = BigInt::from(k.0.clone());
        let mu = BigInt::from(self.mu);

        // Rounded division by the norm: q = round(k·conj(δ) / N(δ)).
        let l0 = round_div(&(&k * (&self.s0 + &mu * &self.s1)), &n);
        let l1 = round_div(&(-&k * &self.s1), &n);

        // ρ = k − q·δ with τ² = μτ − 2 folded in.
        let r0 = &k - (&l0 * &self.s0 - &l1 * &self.s1 * 2);
        let r1 = -(&l0 * &self.s1 + &l1 * &self.s0 + &l1 * &self.s1 * &mu);
        (r0, r1)
    }

    /// τ-NAF digits of k (LSB first, digits in {0, ±1}).
    pub fn tnaf(&self, k: &Scalar) -> Vec<i8> {
        let (mut r0, mut r1) = self.partial_reduce(k);
        let mut digits = Vec::with_capacity(self.m + 8);
        while !r0.is_zero() || !r1.is_zero() {
            if r0.is_odd() {
                // u = 2 − (r0 − 2r1 mod 4) ∈ {−1, 1}.
                let r = (&r0 - &r1 * 2i32).mod_floor(&BigInt::from(4));
                let u: i64 = 2 - r.to_i64().expect("residue fits");
                r0 -= BigInt::from(u);
                digits.push(u as i8);
            } else {
                digits.push(0);
            }
            // (r0 + r1τ)/τ = (r1 + μ·r0/2) − (r0/2)·τ.
            let t: BigInt = &r0 / 2i32;
            r0 = &r1 + &t * (self.mu as i32);
            r1 = -t;
        }
        digits
    }

    /// Width-w τ-NAF digits of k (LSB first, nonzero digits odd with
    /// |d| < 2^(w−1), any two nonzeros at least w apart).
    pub fn wtnaf(&self, k: &Scalar, w: u32) -> Vec<i8> {
        debug_assert!((2..=8).contains(&w));
        let tw = self.tau_residue(w);
        let modulus = 1i64 << w;
        let half = 1i64 << (w - 1);

        let (mut r0, mut r1) = self.partial_reduce(k);
        let mut digits = Vec::with_capacity(self.m + 8);
        while !r0.is_zero() || !r1.is_zero() {
            if r0.is_odd() {
                let r = (&r0 + &r1 * tw).mod_floor(&BigInt::from(modulus));
                let mut u = r.to_i64().expect("residue fits");
                if u >= half {
                    u -= modulus;
                }
                r0 -= BigInt::from(u);
                digits.push(u as i8);
            } else {
                digits.push(0);
            }
            let t: BigInt = &r0 / 2i32;
            r0 = &r1 + &t * (self.mu as i32);
            r1 = -t;
        }
        digits
    }

    /// The integer t_w with τ ≡ t_w (mod τ^w): t_w = 2·U_{w−1}·U_w⁻¹ mod 2^w.
    fn tau_residue(&self, w: u32) -> i64 {
        let modulus = 1i64 << w;
        let mut u_prev: i64 = 0;
        let mut u_cur: i64 = 1;
        for _ in 1..w {
            let next = self.mu as i64 * u_cur - 2 * u_prev;
            u_prev = u_cur;
            u_cur = next;
        }
        // U_w is odd for w ≥ 1, so it is invertible mod 2^w.
        let inv = mod_inverse_pow2(u_cur.rem_euclid(modulus), w);
        (2 * u_prev.rem_euclid(modulus) * inv).rem_euclid(modulus)
    }
}

/// round(num / den) for den > 0, ties away from zero handled by floor of
/// the half-adjusted quotient.
fn round_div(num: &BigInt, den: &BigInt) -> BigInt {
    debug_assert!(den.is_positive());
    (num * 2i32 + den).div_floor(&(den * 2i32))
}

/// Inverse of an odd residue modulo 2^w by Newton lifting.
fn mod_inverse_pow2(a: i64, w: u32) -> i64 {
    debug_assert!(a % 2 != 0);
    let modulus = 1i64 << w;
    let mut x: i64 = 1;
    for _ in 0..6 {
        x = (x * (2 - a * x)).rem_euclid(modulus);
    }
    debug_assert_eq!((a * x).rem_euclid(modulus), 1);
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naf_value(digits: &[i8]) -> BigInt {
        let mut acc = BigInt::zero();
        for &d in digits.iter().rev() {
            acc = acc * 2 + BigInt::from(d);
        }
        acc
    }

    #[test]
    fn naf_reconstructs_and_is_sparse() {
        let mut rng = Prng::from_seed(b"naf");
        for w in 2..=6u32 {
            for _ in 0..10 {
                let k = Scalar::rand_bits(200, &mut rng);
                let digits = k.naf(w);
                assert_eq!(naf_value(&digits), BigInt::from(k.0.clone()));
                for pair in digits.windows(w as usize) {
                    // Any window of w digits has at most one nonzero.
                    let nz = pair.iter().filter(|d| **d != 0).count();
                    assert!(nz <= 1, "w={w}: {pair:?}");
                }
                for &d in &digits {
                    assert!(d == 0 || (d % 2 != 0 && (d as i64).abs() < (1 << (w - 1))));
                }
            }
        }
    }

    #[test]
    fn jsf_reconstructs_both_scalars() {
        let mut rng = Prng::from_seed(b"jsf");
        for _ in 0..10 {
            let k = Scalar::rand_bits(170, &mut rng);
            let l = Scalar::rand_bits(170, &mut rng);
            let digits = k.jsf(&l);
            let mut a0 = BigInt::zero();
            let mut a1 = BigInt::zero();
            for &(d0, d1) in digits.iter().rev() {
                a0 = a0 * 2 + BigInt::from(d0);
                a1 = a1 * 2 + BigInt::from(d1);
            }
            assert_eq!(a0, BigInt::from(k.0.clone()));
            assert_eq!(a1, BigInt::from(l.0.clone()));
        }
    }

    #[test]
    fn tau_context_orders_are_consistent() {
        // #E = h·n must equal 2^m + 1 − V_m, and n must be odd and large.
        for (m, a) in [(163usize, 1u32), (233, 0), (283, 0), (409, 0), (571, 0)] {
            let ctx = TauCtx::new(m, a);
            let order = (BigInt::one() << m) + 1 - &ctx.vm;
            let n = BigInt::from(ctx.n.0.clone());
            assert_eq!(&n * ctx.h, order, "m={m}");
            assert!(ctx.n.bits() >= m - 2, "m={m}");
            assert!(ctx.n.0.is_odd(), "m={m}");
            // Hasse: |V_m| ≤ 2·2^(m/2).
            assert!(ctx.vm.abs() <= BigInt::one() << (m / 2 + 2), "m={m}");
        }
    }

    #[test]
    fn delta_times_tau_minus_one_is_tau_power_identity() {
        // (τ − 1)·(s0 + s1τ) must equal τ^m − 1, i.e. the pair
        // (−2U_{m−1} − 1, U_m). Multiply back in Z[τ] and compare.
        for (m, a) in [(163usize, 1u32), (233, 0)] {
            let ctx = TauCtx::new(m, a);
            let mu = BigInt::from(ctx.mu);
            // (−1 + τ)(s0 + s1τ) = (−s0 − 2 s1) + (s0 − s1 + μ s1)τ.
            let c0 = -&ctx.s0 - 2 * &ctx.s1;
            let c1 = &ctx.s0 - &ctx.s1 + &mu * &ctx.s1;
            // Recompute U_m, U_{m−1} directly.
            let mut u_prev = BigInt::zero();
            let mut u_cur = BigInt::one();
            for _ in 1..m {
                let next = &u_cur * (ctx.mu as i64) - &u_prev * 2;
                u_prev = u_cur;
                u_cur = next;
            }
            assert_eq!(c0, &u_prev * (-2) - 1, "m={m}");
            assert_eq!(c1, u_cur, "m={m}");
        }
    }

    #[test]
    fn tnaf_digits_are_sparse_and_small() {
        let mut rng = Prng::from_seed(b"tnaf");
        let ctx = TauCtx::new(163, 1);
        for _ in 0..5 {
            let k = Scalar::rand_mod(&ctx.n, &mut rng);
            let digits = ctx.tnaf(&k);
            // Partial reduction keeps the length near m.
            assert!(digits.len() <= ctx.m + 6, "len={}", digits.len());
            for pair in digits.windows(2) {
                assert!(pair[0] == 0 || pair[1] == 0);
            }
            let wdigits = ctx.wtnaf(&k, 4);
            assert!(wdigits.len() <= ctx.m + 6);
            for win in wdigits.windows(4) {
                let nz = win.iter().filter(|d| **d != 0).count();
                assert!(nz <= 1, "{win:?}");
            }
        }
    }

    #[test]
    fn scalar_io_roundtrip() {
        let k = Scalar::from_hex("0123456789ABCDEF").unwrap();
        assert_eq!(k, Scalar::from_u64(0x0123_4567_89ab_cdef));
        let bytes = k.to_bytes_be();
        assert_eq!(Scalar::from_bytes_be(&bytes), k);
        assert_eq!(k.bits(), 57);
        assert!(k.bit(0));
        assert!(!k.bit(4));
    }
}
