//! Variable-point and simultaneous scalar multiplication
//!
//! Four interchangeable variable-point multipliers, all agreeing modulo
//! the group order:
//!
//! - `mul_basic` — MSB-first double-and-add;
//! - `mul_const` — the López–Dahab (x, z) Montgomery ladder with y
//!   recovery, running a fixed iteration count with mask-based swaps
//!   (supersingular curves, whose equation the (x, z) formulas do not
//!   cover, run a double-and-add-always ladder instead);
//! - `mul_slide` — width-4 sliding window over the binary expansion; on
//!   Koblitz curves the Lutz–Hasan τ-adic variant slides over the τ-NAF
//!   with a table of small τ-combinations, replacing every doubling with
//!   a Frobenius;
//! - `mul_wtnaf` — width-4 NAF, or width-4 τ-NAF with partial reduction
//!   on Koblitz curves.
//!
//! Simultaneous multiplication k·P + l·Q comes in four flavors (separate,
//! Shamir's trick, interleaved NAFs, Joint Sparse Form) plus the
//! generator-table convenience form.
//!
//! Every multiplier accepts either point representation and returns a
//! normalized point.

#![forbid(unsafe_code)]

use subtle::{Choice, ConditionallySelectable};

use crate::curve::{Curve, Family, Point};
use crate::field::Fb;
use crate::scalar::Scalar;
use crate::{Digit, FB_LIMBS};

/// Window width shared by the sliding-window and w-(T)NAF multipliers.
pub(crate) const WINDOW: u32 = 4;

/// Masked limb-wise swap of two field elements (no secret-dependent
/// branches or indices; always touches every limb).
fn fb_ct_swap(a: &mut Fb, b: &mut Fb, swap: Choice) {
    for i in 0..FB_LIMBS {
        let mut x: Digit = a.0[i];
        let mut y: Digit = b.0[i];
        Digit::conditional_swap(&mut x, &mut y, swap);
        a.0[i] = x;
        b.0[i] = y;
    }
}

impl Curve {
    // ------------------------------------------------------------------
    // Variable-point multipliers
    // ------------------------------------------------------------------

    /// R = k·P with the default multiplier (w-(T)NAF).
    pub fn mul(&self, p: &Point, k: &Scalar) -> Point {
        self.mul_wtnaf(p, k)
    }

    /// MSB-first double-and-add.
    pub fn mul_basic(&self, p: &Point, k: &Scalar) -> Point {
        if p.is_infinity() || k.is_zero() {
            return Point::INFINITY;
        }
        let mut r = Point::INFINITY;
        for i in (0..k.bits()).rev() {
            r = self.dbl(&r);
            if k.bit(i) {
                r = self.add(&r, p);
            }
        }
        self.norm(&r)
    }

    /// Montgomery-ladder multiplication with a fixed iteration count.
    ///
    /// The ladder walks bit-length-of-the-order iterations regardless of
    /// k; the branch pattern and memory accesses inside the loop do not
    /// depend on the bits of k beyond the masked ladder swap.
    pub fn mul_const(&self, p: &Point, k: &Scalar) -> Point {
        if p.is_infinity() || k.is_zero() {
            return Point::INFINITY;
        }
        let steps = self.n.bits().max(k.bits());
        match self.family {
            Family::Supersingular => {
                // Double-and-add-always: both arms are computed, one lands
                // in a dummy accumulator.
                let mut r = Point::INFINITY;
                let mut _sink = Point::INFINITY;
                for i in (0..steps).rev() {
                    r = self.dbl(&r);
                    let sum = self.add(&r, p);
                    if k.bit(i) {
                        r = sum;
                    } else {
                        _sink = sum;
                    }
                }
                self.norm(&r)
            }
            Family::Ordinary | Family::Koblitz => self.ladder(p, k, steps),
        }
    }

    /// López–Dahab (x, z) ladder over y² + xy = x³ + ax² + b.
    fn ladder(&self, p: &Point, k: &Scalar, steps: usize) -> Point {
        let f = &self.field;
        let p = self.norm(p);
        if p.x.is_zero() {
            // The 2-torsion abscissa: k·P is P or ∞ by parity.
            return if k.bit(0) { p } else { Point::INFINITY };
        }
        let b = self.b.value();

        // (1, 0) is the ladder encoding of the identity: the add and
        // double formulas propagate it correctly.
        let mut x0 = Fb::ONE;
        let mut z0 = Fb::ZERO;
        let mut x1 = p.x;
        let mut z1 = Fb::ONE;

        for i in (0..steps).rev() {
            let swap = Choice::from(k.bit(i) as u8);
            fb_ct_swap(&mut x0, &mut x1, swap);
            fb_ct_swap(&mut z0, &mut z1, swap);

            // Differential add against the invariant difference P.
            let t = f.mul(&x0, &z1);
            let u = f.mul(&x1, &z0);
            let zs = f.sqr(&f.add(&t, &u));
            let xs = f.add(&f.mul(&p.x, &zs), &f.mul(&t, &u));
            // Double the low arm.
            let x0s = f.sqr(&x0);
            let z0s = f.sqr(&z0);
            let xd = f.add(&f.sqr(&x0s), &f.mul(&b, &f.sqr(&z0s)));
            let zd = f.mul(&x0s, &z0s);

            x0 = xd;
            z0 = zd;
            x1 = xs;
            z1 = zs;

            fb_ct_swap(&mut x0, &mut x1, swap);
            fb_ct_swap(&mut z0, &mut z1, swap);
        }

        if z0.is_zero() {
            return Point::INFINITY;
        }
        if z1.is_zero() {
            // (k+1)·P = ∞, so k·P = −P.
            return self.neg(&p);
        }

        // López–Dahab y recovery from the two ladder arms.
        let xk = f.mul(&x0, &f.inv(&z0).expect("nonzero z"));
        let t1 = f.add(&x0, &f.mul(&p.x, &z0));
        let t2 = f.add(&x1, &f.mul(&p.x, &z1));
        let t3 = f.add(&f.sqr(&p.x), &p.y);
        let num = f.add(&f.mul(&t1, &t2), &f.mul(&t3, &f.mul(&z0, &z1)));
        let den = f
            .inv(&f.mul(&p.x, &f.mul(&z0, &z1)))
            .expect("nonzero denominator");
        let yk = f.add(&f.mul(&f.add(&p.x, &xk), &f.mul(&num, &den)), &p.y);
        Point::affine(xk, yk)
    }

    /// Width-4 sliding window; Lutz–Hasan τ-adic windows on Koblitz.
    pub fn mul_slide(&self, p: &Point, k: &Scalar) -> Point {
        if p.is_infinity() || k.is_zero() {
            return Point::INFINITY;
        }
        match self.family {
            Family::Koblitz => self.mul_slide_tau(p, k),
            _ => self.mul_slide_binary(p, k),
        }
    }

    fn mul_slide_binary(&self, p: &Point, k: &Scalar) -> Point {
        let w = WINDOW as usize;
        // Odd multiples P, 3P, …, (2^w − 1)P.
        let p = self.norm(p);
        let twop = self.dbl(&p);
        let mut table = Vec::with_capacity(1 << (w - 1));
        table.push(p);
        for i in 1..1usize << (w - 1) {
            table.push(self.norm(&self.add(&table[i - 1], &twop)));
        }

        let mut r = Point::INFINITY;
        let mut i = k.bits() as isize - 1;
        while i >= 0 {
            if !k.bit(i as usize) {
                r = self.dbl(&r);
                i -= 1;
                continue;
            }
            let mut l = (i - w as isize + 1).max(0);
            while !k.bit(l as usize) {
                l += 1;
            }
            let mut val = 0usize;
            for j in (l..=i).rev() {
                val = (val << 1) | k.bit(j as usize) as usize;
            }
            for _ in l..=i {
                r = self.dbl(&r);
            }
            r = self.add(&r, &table[(val - 1) / 2]);
            i = l - 1;
        }
        self.norm(&r)
    }

    /// Sliding windows over the τ-NAF: every run of up to w digits is one
    /// table point, and Frobenius stands in for every doubling.
    fn mul_slide_tau(&self, p: &Point, k: &Scalar) -> Point {
        let w = WINDOW as isize;
        let tau = self.tau.as_ref().expect("Koblitz context");
        let digits = tau.tnaf(k);

        // τ-NAF windows of width ≤ 4 trim to the patterns ±(1),
        // ±(τ² ± 1), ±(τ³ ± 1); precompute the positive-leading ones.
        let p = self.norm(p);
        let t2 = self.frb(&self.frb(&p));
        let t3 = self.frb(&t2);
        let tab2 = [
            self.norm(&self.add(&t2, &p)),
            self.norm(&self.sub(&t2, &p)),
        ];
        let tab3 = [
            self.norm(&self.add(&t3, &p)),
            self.norm(&self.sub(&t3, &p)),
        ];

        let mut r = Point::INFINITY;
        let mut i = digits.len() as isize - 1;
        while i >= 0 {
            let di = digits[i as usize];
            if di == 0 {
                r = self.frb(&r);
                i -= 1;
                continue;
            }
            let mut l = (i - w + 1).max(0);
            while digits[l as usize] == 0 {
                l += 1;
            }
            for _ in l..=i {
                r = self.frb(&r);
            }
            let dl = digits[l as usize];
            let entry = match i - l {
                0 => p,
                2 => tab2[if di == dl { 0 } else { 1 }],
                3 => tab3[if di == dl { 0 } else { 1 }],
                // Adjacent nonzero digits cannot occur in a NAF.
                _ => unreachable!("τ-NAF window of length 2"),
            };
            let signed = if di == 1 { entry } else { self.neg(&entry) };
            r = self.add(&r, &signed);
            i = l - 1;
        }
        self.norm(&r)
    }

    /// Width-4 NAF multiplication; width-4 τ-NAF on Koblitz curves.
    pub fn mul_wtnaf(&self, p: &Point, k: &Scalar) -> Point {
        if p.is_infinity() || k.is_zero() {
            return Point::INFINITY;
        }
        let table = self.odd_multiples(p);
        match self.family {
            Family::Koblitz => {
                let tau = self.tau.as_ref().expect("Koblitz context");
                let digits = tau.wtnaf(k, WINDOW);
                let mut r = Point::INFINITY;
                for &d in digits.iter().rev() {
                    r = self.frb(&r);
                    if d != 0 {
                        let entry = table[(d.unsigned_abs() as usize - 1) / 2];
                        let signed = if d > 0 { entry } else { self.neg(&entry) };
                        r = self.add(&r, &signed);
                    }
                }
                self.norm(&r)
            }
            Family::Ordinary | Family::Supersingular => {
                let digits = k.naf(WINDOW);
                let mut r = Point::INFINITY;
                for &d in digits.iter().rev() {
                    r = self.dbl(&r);
                    if d != 0 {
                        let entry = table[(d.unsigned_abs() as usize - 1) / 2];
                        let signed = if d > 0 { entry } else { self.neg(&entry) };
                        r = self.add(&r, &signed);
                    }
                }
                self.norm(&r)
            }
        }
    }

    /// The odd multiples P, 3P, …, (2^(w−1) − 1)P, normalized.
    pub(crate) fn odd_multiples(&self, p: &Point) -> Vec<Point> {
        let count = 1usize << (WINDOW - 2);
        let p = self.norm(p);
        let twop = self.dbl(&p);
        let mut table = Vec::with_capacity(count);
        table.push(p);
        for i in 1..count {
            table.push(self.norm(&self.add(&table[i - 1], &twop)));
        }
        table
    }

    // ------------------------------------------------------------------
    // Simultaneous multiplication: k·P + l·Q
    // ------------------------------------------------------------------

    /// R = k·P + l·Q with the default simultaneous method (Shamir).
    pub fn mul_sim(&self, p: &Point, k: &Scalar, q: &Point, l: &Scalar) -> Point {
        self.mul_sim_trick(p, k, q, l)
    }

    /// Two separate multiplications and one addition.
    pub fn mul_sim_basic(&self, p: &Point, k: &Scalar, q: &Point, l: &Scalar) -> Point {
        self.norm(&self.add(&self.mul(p, k), &self.mul(q, l)))
    }

    /// Shamir's trick: one shared doubling chain over the joint table
    /// {P, Q, P+Q}.
    pub fn mul_sim_trick(&self, p: &Point, k: &Scalar, q: &Point, l: &Scalar) -> Point {
        let p = self.norm(p);
        let q = self.norm(q);
        let pq = self.norm(&self.add(&p, &q));
        let mut r = Point::INFINITY;
        for i in (0..k.bits().max(l.bits())).rev() {
            r = self.dbl(&r);
            match (k.bit(i), l.bit(i)) {
                (false, false) => {}
                (true, false) => r = self.add(&r, &p),
                (false, true) => r = self.add(&r, &q),
                (true, true) => r = self.add(&r, &pq),
            }
        }
        self.norm(&r)
    }

    /// Interleaved NAFs: independent recodings, one shared doubling chain.
    pub fn mul_sim_inter(&self, p: &Point, k: &Scalar, q: &Point, l: &Scalar) -> Point {
        let dk = k.naf(2);
        let dl = l.naf(2);
        let p = self.norm(p);
        let q = self.norm(q);
        let np = self.neg(&p);
        let nq = self.neg(&q);
        let mut r = Point::INFINITY;
        for i in (0..dk.len().max(dl.len())).rev() {
            r = self.dbl(&r);
            match dk.get(i).copied().unwrap_or(0) {
                1 => r = self.add(&r, &p),
                -1 => r = self.add(&r, &np),
                _ => {}
            }
            match dl.get(i).copied().unwrap_or(0) {
                1 => r = self.add(&r, &q),
                -1 => r = self.add(&r, &nq),
                _ => {}
            }
        }
        self.norm(&r)
    }

    /// Solinas Joint Sparse Form: jointly recoded digits over the table
    /// {P, Q, P+Q, P−Q}.
    pub fn mul_sim_joint(&self, p: &Point, k: &Scalar, q: &Point, l: &Scalar) -> Point {
        let digits = k.jsf(l);
        let p = self.norm(p);
        let q = self.norm(q);
        let pq = self.norm(&self.add(&p, &q));
        let pmq = self.norm(&self.sub(&p, &q));
        let mut r = Point::INFINITY;
        for &(u0, u1) in digits.iter().rev() {
            r = self.dbl(&r);
            let step = match (u0, u1) {
                (0, 0) => None,
                (1, 0) => Some(p),
                (-1, 0) => Some(self.neg(&p)),
                (0, 1) => Some(q),
                (0, -1) => Some(self.neg(&q)),
                (1, 1) => Some(pq),
                (-1, -1) => Some(self.neg(&pq)),
                (1, -1) => Some(pmq),
                (-1, 1) => Some(self.neg(&pmq)),
                _ => unreachable!("JSF digits are in {{0, ±1}}"),
            };
            if let Some(s) = step {
                r = self.add(&r, &s);
            }
        }
        self.norm(&r)
    }

    /// R = k·G + l·Q through the generator's cached fixed-point table.
    pub fn mul_sim_gen(&self, k: &Scalar, q: &Point, l: &Scalar) -> Point {
        self.norm(&self.add(&self.mul_gen(k), &self.mul(q, l)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Prng;
    use crate::CurveId;

    #[test]
    fn order_times_generator_is_infinity() {
        // End-to-end scenario: n·G = ∞ on NIST B-163 (and friends).
        for id in [CurveId::NistB163, CurveId::NistK163, CurveId::EtaS271] {
            let curve = Curve::from_id(id).unwrap();
            let n = curve.n.clone();
            let r = curve.mul_basic(&curve.gen, &n);
            assert!(r.is_infinity(), "{id:?}");
        }
    }

    #[test]
    fn multiplier_variants_agree_on_k163_with_fixed_seed() {
        // End-to-end scenario: deterministic seed "0123456789ABCDEF".
        let curve = Curve::from_id(CurveId::NistK163).unwrap();
        let mut rng = Prng::from_seed(b"0123456789ABCDEF");
        let k = Scalar::rand_mod(&curve.n, &mut rng);
        let p = curve.gen;
        let basic = curve.mul_basic(&p, &k);
        let constant = curve.mul_const(&p, &k);
        let slide = curve.mul_slide(&p, &k);
        let wtnaf = curve.mul_wtnaf(&p, &k);
        assert!(curve.point_eq(&basic, &constant));
        assert!(curve.point_eq(&basic, &slide));
        assert!(curve.point_eq(&basic, &wtnaf));
    }

    #[test]
    fn multiplier_variants_agree_everywhere() {
        for id in [
            CurveId::NistB163,
            CurveId::NistB233,
            CurveId::NistK233,
            CurveId::EtaS271,
        ] {
            let curve = Curve::from_id(id).unwrap();
            let mut rng = Prng::from_seed(b"mul-variants");
            for _ in 0..3 {
                let p = curve.rand(&mut rng);
                let k = Scalar::rand_mod(&curve.n, &mut rng);
                let basic = curve.mul_basic(&p, &k);
                assert!(curve.point_eq(&basic, &curve.mul_const(&p, &k)), "{id:?} const");
                assert!(curve.point_eq(&basic, &curve.mul_slide(&p, &k)), "{id:?} slide");
                assert!(curve.point_eq(&basic, &curve.mul_wtnaf(&p, &k)), "{id:?} wtnaf");
            }
        }
    }

    #[test]
    fn small_scalars_match_repeated_addition() {
        let curve = Curve::from_id(CurveId::NistB163).unwrap();
        let mut rng = Prng::from_seed(b"mul-small");
        let p = curve.rand(&mut rng);
        let mut acc = Point::INFINITY;
        for k in 0..=8u64 {
            let via_mul = curve.mul(&p, &Scalar::from_u64(k));
            assert!(curve.point_eq(&via_mul, &acc), "k = {k}");
            acc = curve.add(&acc, &p);
        }
    }

    #[test]
    fn edge_scalars_and_points() {
        let curve = Curve::from_id(CurveId::NistK233).unwrap();
        let mut rng = Prng::from_seed(b"mul-edge");
        let p = curve.rand(&mut rng);
        let zero = Scalar::zero();
        assert!(curve.mul_basic(&p, &zero).is_infinity());
        assert!(curve.mul_const(&p, &zero).is_infinity());
        assert!(curve.mul_slide(&p, &zero).is_infinity());
        assert!(curve.mul_wtnaf(&p, &zero).is_infinity());
        let k = Scalar::rand_mod(&curve.n, &mut rng);
        assert!(curve.mul(&Point::INFINITY, &k).is_infinity());
        // k ≡ −1 (mod n): the result is −P.
        let mut bytes = curve.n.to_bytes_be();
        let last = bytes.len() - 1;
        bytes[last] -= 1; // n is odd, no borrow
        let nm1 = Scalar::from_bytes_be(&bytes);
        assert!(curve.point_eq(&curve.mul(&p, &nm1), &curve.neg(&p)));
    }

    #[test]
    fn simultaneous_variants_agree() {
        for id in [CurveId::NistB163, CurveId::NistK283] {
            let curve = Curve::from_id(id).unwrap();
            let mut rng = Prng::from_seed(b"mul-sim");
            for _ in 0..3 {
                let p = curve.rand(&mut rng);
                let q = curve.rand(&mut rng);
                let k = Scalar::rand_mod(&curve.n, &mut rng);
                let l = Scalar::rand_mod(&curve.n, &mut rng);
                let basic = curve.mul_sim_basic(&p, &k, &q, &l);
                assert!(curve.point_eq(&basic, &curve.mul_sim_trick(&p, &k, &q, &l)), "{id:?}");
                assert!(curve.point_eq(&basic, &curve.mul_sim_inter(&p, &k, &q, &l)), "{id:?}");
                assert!(curve.point_eq(&basic, &curve.mul_sim_joint(&p, &k, &q, &l)), "{id:?}");
                let gen_side = curve.mul_sim_gen(&k, &q, &l);
                let expect = curve.mul_sim_basic(&curve.gen, &k, &q, &l);
                assert!(curve.point_eq(&gen_side, &expect), "{id:?}");
            }
        }
    }
}
