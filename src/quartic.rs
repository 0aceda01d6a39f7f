//! Quartic extension GF(2^{4m}) — the pairing target field
//!
//! Elements are c0 + c1·s + c2·t + c3·s·t over GF(2^m) with the tower
//! relations **s² = s + 1** and **t² = t + s**; equivalently the quadratic
//! tower GF(2^m)[s] then [t]. The supersingular distortion map and the
//! Eta_T line functions live in exactly this basis.
//!
//! Multiplication is Karatsuba over both tower levels (3 × 3 = **9 base
//! multiplications**); squaring is component-wise (4 base squarings plus
//! XORs) because squaring is linear in characteristic 2; inversion goes
//! down the tower by conjugate norms and costs a **single** base-field
//! inversion — the only place the pairing layer ever inverts.
//!
//! The Frobenius power maps below hardcode m ≡ 3 (mod 4), which both
//! supersingular presets satisfy; the debug assertion at each entry keeps
//! that assumption explicit.

#![forbid(unsafe_code)]

use crate::field::{Fb, FieldParams};
use crate::scalar::Scalar;

/// An element of GF(2^{4m}): [c0, c1, c2, c3] = c0 + c1·s + c2·t + c3·st.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fb4(pub [Fb; 4]);

impl Fb4 {
    /// The additive identity.
    pub const ZERO: Fb4 = Fb4([Fb::ZERO; 4]);

    /// The multiplicative identity.
    pub const ONE: Fb4 = Fb4([Fb::ONE, Fb::ZERO, Fb::ZERO, Fb::ZERO]);

    /// Element of the base field embedded at c0.
    #[inline]
    pub fn from_base(c0: Fb) -> Fb4 {
        Fb4([c0, Fb::ZERO, Fb::ZERO, Fb::ZERO])
    }

    /// True iff all four coordinates are zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Fb::is_zero)
    }

    /// Component-wise sum.
    pub fn add(&self, rhs: &Fb4, f: &FieldParams) -> Fb4 {
        Fb4([
            f.add(&self.0[0], &rhs.0[0]),
            f.add(&self.0[1], &rhs.0[1]),
            f.add(&self.0[2], &rhs.0[2]),
            f.add(&self.0[3], &rhs.0[3]),
        ])
    }

    /// Full tower product (9 base multiplications).
    pub fn mul(&self, rhs: &Fb4, f: &FieldParams) -> Fb4 {
        let u0 = [self.0[0], self.0[1]];
        let u1 = [self.0[2], self.0[3]];
        let v0 = [rhs.0[0], rhs.0[1]];
        let v1 = [rhs.0[2], rhs.0[3]];

        let w0 = mul2(&u0, &v0, f);
        let w1 = mul2(&u1, &v1, f);
        let us = [f.add(&u0[0], &u1[0]), f.add(&u0[1], &u1[1])];
        let vs = [f.add(&v0[0], &v1[0]), f.add(&v0[1], &v1[1])];
        let w2 = mul2(&us, &vs, f);

        // (u0 + u1·t)(v0 + v1·t) with t² = t + s:
        //   low  = u0v0 + s·u1v1
        //   high = (u0+u1)(v0+v1) + u0v0        (the +u1v1·t² fold cancels)
        let sw1 = mul2_s(&w1, f);
        let low = [f.add(&w0[0], &sw1[0]), f.add(&w0[1], &sw1[1])];
        let high = [f.add(&w2[0], &w0[0]), f.add(&w2[1], &w0[1])];
        Fb4([low[0], low[1], high[0], high[1]])
    }

    /// Squaring: component squarings plus the tower folds.
    pub fn sqr(&self, f: &FieldParams) -> Fb4 {
        let a = f.sqr(&self.0[0]);
        let b = f.sqr(&self.0[1]);
        let c = f.sqr(&self.0[2]);
        let d = f.sqr(&self.0[3]);
        Fb4([
            f.add(&f.add(&a, &b), &d),
            f.add(&b, &c),
            f.add(&c, &d),
            d,
        ])
    }

    /// Frobenius π: x ↦ x^(2^m). Coefficients are fixed; the basis
    /// elements walk their orbits (s ↦ s+1, t ↦ t+s+1 for m ≡ 3 mod 4).
    pub fn frob(&self, f: &FieldParams) -> Fb4 {
        debug_assert_eq!(f.m % 4, 3, "Frobenius map hardcodes m ≡ 3 (mod 4)");
        let [c0, c1, c2, c3] = self.0;
        Fb4([
            f.add(&f.add(&c0, &c1), &c2),
            f.add(&f.add(&c1, &c2), &c3),
            f.add(&c2, &c3),
            c3,
        ])
    }

    /// Conjugation π²: x ↦ x^(2^{2m}) (s fixed, t ↦ t+1).
    pub fn conj(&self, f: &FieldParams) -> Fb4 {
        let [c0, c1, c2, c3] = self.0;
        Fb4([f.add(&c0, &c2), f.add(&c1, &c3), c2, c3])
    }

    /// π³ = π ∘ π².
    pub fn frob3(&self, f: &FieldParams) -> Fb4 {
        self.conj(f).frob(f)
    }

    /// Inverse by conjugate norms down the tower; one base inversion.
    ///
    /// Inverting zero is rejected exactly like the base field does.
    pub fn inv(&self, f: &FieldParams) -> crate::Result<Fb4> {
        let u0 = [self.0[0], self.0[1]];
        let u1 = [self.0[2], self.0[3]];
        // N = u · ū with ū = (u0 + u1) + u1·t, landing in GF(2^{2m}).
        let cj = [f.add(&u0[0], &u1[0]), f.add(&u0[1], &u1[1])];
        let a = mul2(&u0, &cj, f);
        let sb = mul2_s(&mul2(&u1, &u1, f), f);
        let norm = [f.add(&a[0], &sb[0]), f.add(&a[1], &sb[1])];
        let ninv = inv2(&norm, f)?;
        // u⁻¹ = ū · N⁻¹, distributed over both halves of ū.
        let lo = mul2(&cj, &ninv, f);
        let hi = mul2(&u1, &ninv, f);
        Ok(Fb4([lo[0], lo[1], hi[0], hi[1]]))
    }

    /// x^k by square-and-multiply over the scalar's bits (MSB first).
    pub fn pow(&self, k: &Scalar, f: &FieldParams) -> Fb4 {
        let mut acc = Fb4::ONE;
        for i in (0..k.bits()).rev() {
            acc = acc.sqr(f);
            if k.bit(i) {
                acc = acc.mul(self, f);
            }
        }
        acc
    }

    /// x^(2^e): e successive squarings (sparse-exponent workhorse of the
    /// final exponentiation).
    pub fn pow2(&self, e: usize, f: &FieldParams) -> Fb4 {
        let mut acc = *self;
        for _ in 0..e {
            acc = acc.sqr(f);
        }
        acc
    }
}

// ---------------------------------------------------------------------------
// GF(2^{2m}) helpers: pairs [a, b] = a + b·s with s² = s + 1
// ---------------------------------------------------------------------------

/// Karatsuba product in the quadratic subfield (3 base multiplications).
fn mul2(x: &[Fb; 2], y: &[Fb; 2], f: &FieldParams) -> [Fb; 2] {
    let p0 = f.mul(&x[0], &y[0]);
    let p1 = f.mul(&x[1], &y[1]);
    let xs = f.add(&x[0], &x[1]);
    let ys = f.add(&y[0], &y[1]);
    let p2 = f.mul(&xs, &ys);
    // (a+bs)(c+ds) = (ac + bd) + (ad + bc + bd)s
    [f.add(&p0, &p1), f.add(&p2, &p0)]
}

/// Multiplication by s: (a + bs)·s = b + (a+b)s.
#[inline]
fn mul2_s(x: &[Fb; 2], f: &FieldParams) -> [Fb; 2] {
    [x[1], f.add(&x[0], &x[1])]
}

/// Inverse in the quadratic subfield via the norm a² + ab + b².
fn inv2(x: &[Fb; 2], f: &FieldParams) -> crate::Result<[Fb; 2]> {
    let norm = f.add(
        &f.add(&f.sqr(&x[0]), &f.mul(&x[0], &x[1])),
        &f.sqr(&x[1]),
    );
    let ninv = f.inv(&norm)?;
    // (a+bs)⁻¹ = (a+b + bs)·norm⁻¹
    Ok([f.mul(&f.add(&x[0], &x[1]), &ninv), f.mul(&x[1], &ninv)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Prng;

    fn f271() -> FieldParams {
        FieldParams::new(271, 207, 175, 111).unwrap()
    }

    fn rand4(f: &FieldParams, rng: &mut Prng) -> Fb4 {
        Fb4([f.rand(rng), f.rand(rng), f.rand(rng), f.rand(rng)])
    }

    #[test]
    fn ring_laws() {
        let f = f271();
        let mut rng = Prng::from_seed(b"fb4-ring");
        for _ in 0..5 {
            let a = rand4(&f, &mut rng);
            let b = rand4(&f, &mut rng);
            let c = rand4(&f, &mut rng);
            assert_eq!(a.mul(&b, &f), b.mul(&a, &f));
            assert_eq!(
                a.mul(&b, &f).mul(&c, &f),
                a.mul(&b.mul(&c, &f), &f)
            );
            assert_eq!(
                a.mul(&b.add(&c, &f), &f),
                a.mul(&b, &f).add(&a.mul(&c, &f), &f)
            );
            assert_eq!(a.mul(&Fb4::ONE, &f), a);
            assert_eq!(a.sqr(&f), a.mul(&a, &f));
        }
    }

    #[test]
    fn inversion_and_pow() {
        let f = f271();
        let mut rng = Prng::from_seed(b"fb4-inv");
        for _ in 0..5 {
            let mut a = rand4(&f, &mut rng);
            while a.is_zero() {
                a = rand4(&f, &mut rng);
            }
            let ai = a.inv(&f).unwrap();
            assert_eq!(a.mul(&ai, &f), Fb4::ONE);
        }
        assert!(Fb4::ZERO.inv(&f).is_err());

        let a = rand4(&f, &mut rng);
        let k5 = Scalar::from_u64(5);
        let mut by_hand = Fb4::ONE;
        for _ in 0..5 {
            by_hand = by_hand.mul(&a, &f);
        }
        assert_eq!(a.pow(&k5, &f), by_hand);
        assert_eq!(a.pow2(3, &f), a.sqr(&f).sqr(&f).sqr(&f));
    }

    #[test]
    fn frobenius_matches_repeated_squaring() {
        let f = f271();
        let mut rng = Prng::from_seed(b"fb4-frob");
        let a = rand4(&f, &mut rng);
        // π is x ↦ x^(2^m): m squarings must reproduce it exactly.
        assert_eq!(a.frob(&f), a.pow2(f.m, &f));
        // π² likewise, and π∘π = π².
        assert_eq!(a.conj(&f), a.pow2(2 * f.m, &f));
        assert_eq!(a.frob(&f).frob(&f), a.conj(&f));
        // π⁴ is the identity on GF(2^{4m}).
        assert_eq!(a.conj(&f).conj(&f), a);
        assert_eq!(a.frob3(&f).frob(&f), a);
    }
}
