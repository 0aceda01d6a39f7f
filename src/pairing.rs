//! Eta_T pairing on supersingular binary curves
//!
//! For E: y² + y = x³ + x + b over GF(2^m), m ≡ 7 (mod 8), the group
//! order is N = 2^m + 2^((m+1)/2) + 1 and the Eta_T parameter is
//! T = 2^((m+1)/2) + 1 = N − 2^m, so a Miller loop of (m+1)/2 doubling
//! steps plus one addition computes f_{T,P}(ψ(Q)); raising to
//! M = (2^{2m} − 1)(2^m − 2^((m+1)/2) + 1) = (2^{4m} − 1)/N yields the
//! reduced pairing. The distortion map is ψ(x, y) = (x + s², y + sx + t)
//! into the tower of [`crate::quartic`].
//!
//! Two structural gifts of these curves drive both variants:
//!
//! - **Doubling is almost Frobenius**: 2(x, y) = (x⁴ + 1, y⁴ + x⁴), so
//!   the chain 2^i·P has the closed form x_i = x^{4^i} + (i mod 2),
//!   y_i = y^{4^i} + (i mod 2)·x^{4^i} + [i mod 4 ∈ {2,3}], and after
//!   (m+1)/2 steps (a multiple of 4 here) the chain lands exactly on
//!   (x², y²).
//! - **Vertical lines live in GF(2^{2m})** and die in the final
//!   exponentiation, so the Miller loop never divides.
//!
//! `pairing_etatn` is the plain accumulator-squaring loop (squarings
//! only). `pairing_etats` is the same product pulled through the field
//! Frobenius so each factor takes one square root of P's coordinates and
//! one squaring of Q's, multiplied up **without** accumulator squarings;
//! the basis constants s, t walk their period-4 orbit and the residual
//! 2-power of the exponent is removed after the final exponentiation by
//! m − 1 cyclotomic squarings. The two variants therefore agree by
//! construction.

#![forbid(unsafe_code)]

use tracing::debug;

use crate::curve::{Curve, Family, Point};
use crate::field::{Fb, FieldParams};
use crate::quartic::Fb4;
use crate::{Error, Result};

/// Reduced Eta_T pairing with the default variant selection.
pub fn pairing(curve: &Curve, p: &Point, q: &Point) -> Result<Fb4> {
    curve.pairing_etatn(p, q)
}

/// A tangent-line factor in the sparse shape A + B·s + σ^j(t) (+ B when
/// σ^j(s) = s + 1). `j` indexes the period-4 Frobenius orbit of (s, t).
fn fold_line(f: &FieldParams, a: &Fb, b: &Fb, j: usize) -> Fb4 {
    let mut c0 = *a;
    let mut c1 = *b;
    if j & 1 == 1 {
        // σ^j(s) = s + 1 for odd j.
        c0 = f.add(&c0, b);
    }
    if j == 1 || j == 3 {
        // σ^j(t) contains s.
        c1 = f.add(&c1, &Fb::ONE);
    }
    if j == 2 || j == 3 {
        // σ^j(t) contains 1.
        c0 = f.add(&c0, &Fb::ONE);
    }
    Fb4([c0, c1, Fb::ONE, Fb::ZERO])
}

impl Curve {
    fn pairing_guard(&self, p: &Point, q: &Point) -> Result<Option<(Point, Point)>> {
        if self.family != Family::Supersingular {
            return Err(Error::Invalid("pairing requires a supersingular curve"));
        }
        debug_assert_eq!(self.field.m % 8, 7);
        if p.is_infinity() || q.is_infinity() {
            return Ok(None);
        }
        Ok(Some((self.norm(p), self.norm(q))))
    }

    /// Eta_T pairing, square-root-free variant.
    ///
    /// Accumulator-squaring Miller loop: each of the (m+1)/2 iterations
    /// squares the accumulator, folds in the tangent line at the running
    /// chain point, and advances the chain with two squarings per
    /// coordinate. One addition line against P closes the loop.
    pub fn pairing_etatn(&self, p: &Point, q: &Point) -> Result<Fb4> {
        let (p, q) = match self.pairing_guard(p, q)? {
            None => return Ok(Fb4::ONE),
            Some(pq) => pq,
        };
        let f = &self.field;
        debug!(m = f.m, "eta_t pairing (etatn)");

        let mut xv = p.x;
        let mut yv = p.y;
        let mut acc = Fb4::ONE;
        for _ in 0..(f.m + 1) / 2 {
            // Tangent at V against ψ(Q): slope is xV² + 1.
            let u = f.add_digit(&f.sqr(&xv), 1);
            let a = f.add(
                &f.add(&yv, &q.y),
                &f.mul(&u, &f.add_digit(&f.add(&xv, &q.x), 1)),
            );
            let b = f.add(&u, &q.x);
            acc = acc.sqr(f);
            acc = acc.mul(&fold_line(f, &a, &b, 0), f);
            // 2V = (xV⁴ + 1, yV⁴ + xV⁴).
            let x4 = f.sqr(&f.sqr(&xv));
            let y4 = f.sqr(&f.sqr(&yv));
            xv = f.add_digit(&x4, 1);
            yv = f.add(&y4, &x4);
        }
        // The chain closes on the Frobenius image of P.
        debug_assert_eq!(xv, f.sqr(&p.x));
        debug_assert_eq!(yv, f.sqr(&p.y));

        if let Some(line) = addition_line(f, &p, &q, false) {
            acc = acc.mul(&line, f);
        }
        Ok(self.final_exp(&acc))
    }

    /// Eta_T pairing, square-root variant.
    ///
    /// The same Miller value factored through the field Frobenius: the
    /// product is accumulated **without** squaring the accumulator, while
    /// P's coordinates take one square root and Q's one squaring per
    /// iteration and the line constants walk the (s, t) orbit. The
    /// leftover power of two is shed after the final exponentiation.
    pub fn pairing_etats(&self, p: &Point, q: &Point) -> Result<Fb4> {
        let (p, q) = match self.pairing_guard(p, q)? {
            None => return Ok(Fb4::ONE),
            Some(pq) => pq,
        };
        let f = &self.field;
        debug!(m = f.m, "eta_t pairing (etats)");
        let n = (f.m + 1) / 2;

        // Transformed running coordinates: P at exponent 2^(i−n) as i
        // descends (plain at first, one root per step), Q at exponent
        // 2^(2−n−i) ≡ 2 (mod m) at first, one squaring per step.
        let mut xp = p.x;
        let mut yp = p.y;
        // xp² maintained alongside: after the first step the root hands
        // it back for free.
        let mut xp_sq = f.sqr(&p.x);
        let mut xq = f.sqr(&q.x);
        let mut yq = f.sqr(&q.y);

        let mut acc = Fb4::ONE;
        for step in 0..n {
            let i = n - step;
            // Chain-point corrections from the closed form of 2^(i−1)·P.
            let eps = (i - 1) & 1;
            let delta = matches!((i - 1) % 4, 2 | 3);
            // (s, t) orbit index: 2 − n − i ≡ step + 2 (mod 4).
            let j = (step + 2) % 4;

            // Transformed chain point: xV = xp + ε, xV² + 1 = xp² + ε + 1.
            let xv = if eps == 1 { f.add_digit(&xp, 1) } else { xp };
            let u = if eps == 1 {
                xp_sq
            } else {
                f.add_digit(&xp_sq, 1)
            };
            let mut yv = if eps == 1 { f.add(&yp, &xp) } else { yp };
            if delta {
                yv = f.add_digit(&yv, 1);
            }

            let a = f.add(
                &f.add(&yv, &yq),
                &f.mul(&u, &f.add_digit(&f.add(&xv, &xq), 1)),
            );
            let b = f.add(&u, &xq);
            acc = acc.mul(&fold_line(f, &a, &b, j), f);

            xp_sq = xp;
            xp = f.srt(&xp);
            yp = f.srt(&yp);
            xq = f.sqr(&xq);
            yq = f.sqr(&yq);
        }

        // Addition line, pulled through σ^(1−m): coordinates squared once,
        // t twisted by σ² (t ↦ t + 1).
        let p2 = Point::affine(f.sqr(&p.x), f.sqr(&p.y));
        let q2 = Point::affine(f.sqr(&q.x), f.sqr(&q.y));
        if let Some(line) = addition_line(f, &p2, &q2, true) {
            acc = acc.mul(&line, f);
        }

        // final_exp(f^(2^(3m+1)))^(2^(m−1)) = final_exp(f).
        Ok(self.final_exp(&acc).pow2(f.m - 1, f))
    }

    /// Final exponentiation to M = (2^{2m} − 1)(2^m + 1 − 2^((m+1)/2)).
    ///
    /// The first factor is conjugate-over-inverse (the layer's only true
    /// inversion); the second uses π and cyclotomic squarings, with the
    /// conjugate standing in for the inverse inside the cyclotomic
    /// subgroup.
    fn final_exp(&self, v: &Fb4) -> Fb4 {
        let f = &self.field;
        let y = v
            .conj(f)
            .mul(&v.inv(f).expect("line products are nonzero"), f);
        let yt = y.pow2((f.m + 1) / 2, f);
        y.frob(f).mul(&y, f).mul(&yt.conj(f), f)
    }
}

/// The addition line ℓ_{V,P}(ψ(Q)) scaled by the subfield factor
/// (xV + xP), with V = (xP², yP²) the closed chain endpoint.
///
/// Returns `None` for the vertical case V = −P (a pure subfield factor).
/// `twist` selects the σ²-image of t for the etats bookkeeping.
fn addition_line(f: &FieldParams, p: &Point, q: &Point, twist: bool) -> Option<Fb4> {
    let xv = f.sqr(&p.x);
    let yv = f.sqr(&p.y);
    let dx = f.add(&xv, &p.x);
    if dx.is_zero() {
        let dy = f.add(&yv, &p.y);
        if dy.is_zero() {
            // V = P: the addition degenerates to a tangent.
            let u = f.add_digit(&f.sqr(&p.x), 1);
            let a = f.add(
                &f.add(&p.y, &q.y),
                &f.mul(&u, &f.add_digit(&f.add(&p.x, &q.x), 1)),
            );
            let b = f.add(&u, &q.x);
            return Some(fold_line(f, &a, &b, if twist { 2 } else { 0 }));
        }
        // V = −P: vertical line, entirely in the subfield.
        return None;
    }
    let dy = f.add(&yv, &p.y);
    // (xV+xP)(y + yP) + (yV+yP)(x + xP) at ψ(Q) = (xQ + s², yQ + s·xQ + t).
    let a = f.add(
        &f.mul(&dx, &f.add(&q.y, &p.y)),
        &f.mul(&dy, &f.add_digit(&f.add(&q.x, &p.x), 1)),
    );
    let b = f.add(&f.mul(&dx, &q.x), &dy);
    let (c0, c2) = if twist {
        // σ²(t) = t + 1 folds the t-coefficient into the constant.
        (f.add(&a, &dx), dx)
    } else {
        (a, dx)
    };
    Some(Fb4([c0, b, c2, Fb::ZERO]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Prng;
    use crate::scalar::Scalar;
    use crate::CurveId;

    fn setup() -> (Curve, Prng) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        (
            Curve::from_id(CurveId::EtaS271).unwrap(),
            Prng::from_seed(b"pairing"),
        )
    }

    #[test]
    fn non_degenerate_at_the_generator() {
        let (curve, _) = setup();
        let e = pairing(&curve, &curve.gen, &curve.gen).unwrap();
        assert_ne!(e, Fb4::ONE);
        assert!(!e.is_zero());
    }

    #[test]
    fn infinity_maps_to_one() {
        let (curve, mut rng) = setup();
        let p = curve.rand(&mut rng);
        assert_eq!(pairing(&curve, &p, &Point::INFINITY).unwrap(), Fb4::ONE);
        assert_eq!(pairing(&curve, &Point::INFINITY, &p).unwrap(), Fb4::ONE);
    }

    #[test]
    fn rejects_non_pairing_curves() {
        let curve = Curve::from_id(CurveId::NistB163).unwrap();
        let g = curve.gen;
        assert!(matches!(
            pairing(&curve, &g, &g),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn variants_agree() {
        let (curve, mut rng) = setup();
        for _ in 0..3 {
            let p = curve.rand(&mut rng);
            let q = curve.rand(&mut rng);
            let n = curve.pairing_etatn(&p, &q).unwrap();
            let s = curve.pairing_etats(&p, &q).unwrap();
            assert_eq!(n, s);
        }
    }

    #[test]
    fn bilinear_three_five() {
        // End-to-end scenario: e(3P, 5Q) = e(P, Q)^15 on ETA-S271.
        let (curve, mut rng) = setup();
        let p = curve.rand(&mut rng);
        let q = curve.rand(&mut rng);
        let three = Scalar::from_u64(3);
        let five = Scalar::from_u64(5);
        let lhs = pairing(&curve, &curve.mul(&p, &three), &curve.mul(&q, &five)).unwrap();
        let rhs = pairing(&curve, &p, &q)
            .unwrap()
            .pow(&Scalar::from_u64(15), &curve.field);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn bilinear_in_each_slot() {
        let (curve, mut rng) = setup();
        let p = curve.rand(&mut rng);
        let q = curve.rand(&mut rng);
        let two = Scalar::from_u64(2);
        let e = pairing(&curve, &p, &q).unwrap();
        let e2 = e.sqr(&curve.field);
        let left = pairing(&curve, &curve.dbl(&p), &q).unwrap();
        let right = pairing(&curve, &p, &curve.dbl(&q)).unwrap();
        assert_eq!(left, e2);
        assert_eq!(right, e2);
        assert_eq!(left, pairing(&curve, &p, &q).unwrap().pow(&two, &curve.field));
    }

    #[test]
    fn bilinear_with_random_scalars() {
        let (curve, mut rng) = setup();
        let p = curve.rand(&mut rng);
        let q = curve.rand(&mut rng);
        let a = Scalar::rand_bits(32, &mut rng);
        let b = Scalar::rand_bits(32, &mut rng);
        let lhs = pairing(&curve, &curve.mul(&p, &a), &curve.mul(&q, &b)).unwrap();
        let rhs = pairing(&curve, &p, &q).unwrap().pow(&a.mul(&b), &curve.field);
        assert_eq!(lhs, rhs);
    }

    #[test]
    #[cfg_attr(not(feature = "big-pairing-tests"), ignore)]
    fn eta_s1223_bilinearity() {
        let curve = Curve::from_id(CurveId::EtaS1223).unwrap();
        let mut rng = Prng::from_seed(b"pairing-1223");
        let p = curve.rand(&mut rng);
        let q = curve.rand(&mut rng);
        let three = Scalar::from_u64(3);
        let lhs = pairing(&curve, &curve.mul(&p, &three), &q).unwrap();
        let rhs = pairing(&curve, &p, &q).unwrap().pow(&three, &curve.field);
        assert_eq!(lhs, rhs);
        let n = curve.pairing_etatn(&p, &q).unwrap();
        let s = curve.pairing_etats(&p, &q).unwrap();
        assert_eq!(n, s);
    }
}
