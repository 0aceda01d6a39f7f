//! Fixed-point precomputation tables
//!
//! Six paired builder/consumer strategies for k·P with P fixed, matching
//! the variable-point multipliers in spirit but trading memory for the
//! doubling chain:
//!
//! | strategy | table | consumer |
//! |---|---|---|
//! | `basic` | 2^i·P, i < t | bit-indexed additions |
//! | `yaowi` | 2^(e·i)·P | Yao bucket aggregation, base 2^e |
//! | `nafwi` | 2^(e·i)·P | Yao aggregation over NAF chunks |
//! | `combs` | 2^e column sums | single-table comb |
//! | `combd` | 2^(e+1) column sums | double-table comb |
//! | `wtnaf` | odd multiples | w-(T)NAF digit walk |
//!
//! A [`PrecompTable`] remembers which builder produced it, so a consumer
//! can never run against a foreign layout. Scalars are expected reduced
//! below the group order; the tables cover exactly that bit width.
//!
//! The comb and windowing depth is fixed at 4.

#![forbid(unsafe_code)]

use tracing::debug;

use crate::curve::{Curve, Family, Point};
use crate::scalar::Scalar;

/// Comb/windowing depth e shared by the windowed fixed-point builders.
pub const DEPTH: usize = 4;

/// Which builder produced a table (and which consumer must read it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAlg {
    /// Doubling ladder: 2^i·P.
    Basic,
    /// Yao windowing, base 2^DEPTH.
    Yaowi,
    /// NAF windowing over the same power table.
    Nafwi,
    /// Single-table comb.
    Combs,
    /// Double-table comb.
    Combd,
    /// w-(T)NAF odd multiples.
    Wtnaf,
}

/// A fixed-point table: the points plus the layout metadata its consumer
/// needs (`span` is the comb column span, or the covered bit width).
#[derive(Debug)]
pub struct PrecompTable {
    /// Builder that produced this table.
    pub alg: FixAlg,
    /// Precomputed points, layout per `alg`.
    pub pts: Vec<Point>,
    /// Comb column span d, or covered bit length for the power tables.
    pub span: usize,
}

impl Curve {
    /// Build a fixed-point table for `p` with the given strategy.
    pub fn mul_pre(&self, alg: FixAlg, p: &Point) -> PrecompTable {
        let table = match alg {
            FixAlg::Basic => self.pre_basic(p),
            FixAlg::Yaowi => self.pre_powers(FixAlg::Yaowi, p),
            FixAlg::Nafwi => self.pre_powers(FixAlg::Nafwi, p),
            FixAlg::Combs => self.pre_combs(p),
            FixAlg::Combd => self.pre_combd(p),
            FixAlg::Wtnaf => PrecompTable {
                alg: FixAlg::Wtnaf,
                pts: self.odd_multiples(p),
                span: 0,
            },
        };
        debug!(alg = ?alg, points = table.pts.len(), "fixed-point table built");
        table
    }

    /// R = k·T using a table built by [`Curve::mul_pre`].
    pub fn mul_fix(&self, table: &PrecompTable, k: &Scalar) -> Point {
        if k.is_zero() {
            return Point::INFINITY;
        }
        match table.alg {
            FixAlg::Basic => self.fix_basic(table, k),
            FixAlg::Yaowi => self.fix_yaowi(table, k),
            FixAlg::Nafwi => self.fix_nafwi(table, k),
            FixAlg::Combs => self.fix_combs(table, k),
            FixAlg::Combd => self.fix_combd(table, k),
            FixAlg::Wtnaf => self.fix_wtnaf(table, k),
        }
    }

    /// R = k·G through the context's cached generator table.
    pub fn mul_gen(&self, k: &Scalar) -> Point {
        let table = self
            .gen_table
            .get_or_init(|| self.mul_pre(FixAlg::Combs, &self.gen));
        self.mul_fix(table, k)
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    fn pre_basic(&self, p: &Point) -> PrecompTable {
        let t = self.n.bits();
        let mut pts = Vec::with_capacity(t);
        let mut cur = self.norm(p);
        for _ in 0..t {
            pts.push(cur);
            cur = self.norm(&self.dbl(&cur));
        }
        PrecompTable {
            alg: FixAlg::Basic,
            pts,
            span: t,
        }
    }

    /// Power table 2^(e·i)·P shared by the Yao and NAF windowing methods.
    fn pre_powers(&self, alg: FixAlg, p: &Point) -> PrecompTable {
        let t = self.n.bits();
        // One extra entry: NAF expansions run one digit past the top.
        let entries = (t + DEPTH) / DEPTH + 1;
        let mut pts = Vec::with_capacity(entries);
        let mut cur = self.norm(p);
        for _ in 0..entries {
            pts.push(cur);
            for _ in 0..DEPTH {
                cur = self.dbl(&cur);
            }
            cur = self.norm(&cur);
        }
        PrecompTable { alg, pts, span: t }
    }

    fn pre_combs(&self, p: &Point) -> PrecompTable {
        let t = self.n.bits();
        let d = (t + DEPTH - 1) / DEPTH;
        let mut powers = Vec::with_capacity(DEPTH);
        let mut cur = self.norm(p);
        for _ in 0..DEPTH {
            powers.push(cur);
            for _ in 0..d {
                cur = self.dbl(&cur);
            }
            cur = self.norm(&cur);
        }
        let mut pts = vec![Point::INFINITY; 1 << DEPTH];
        for u in 1usize..1 << DEPTH {
            let top = usize::BITS as usize - 1 - u.leading_zeros() as usize;
            pts[u] = self.norm(&self.add(&pts[u & !(1 << top)], &powers[top]));
        }
        PrecompTable {
            alg: FixAlg::Combs,
            pts,
            span: d,
        }
    }

    fn pre_combd(&self, p: &Point) -> PrecompTable {
        let single = self.pre_combs(p);
        let d = single.span;
        let half = (d + 1) / 2;
        let mut pts = single.pts;
        // Second table: the same column sums shifted up by ⌈d/2⌉.
        for u in 0..1usize << DEPTH {
            let mut shifted = pts[u];
            for _ in 0..half {
                shifted = self.dbl(&shifted);
            }
            pts.push(self.norm(&shifted));
        }
        PrecompTable {
            alg: FixAlg::Combd,
            pts,
            span: d,
        }
    }

    // ------------------------------------------------------------------
    // Consumers
    // ------------------------------------------------------------------

    fn fix_basic(&self, table: &PrecompTable, k: &Scalar) -> Point {
        let mut r = Point::INFINITY;
        for i in 0..k.bits().min(table.pts.len()) {
            if k.bit(i) {
                r = self.add(&r, &table.pts[i]);
            }
        }
        self.norm(&r)
    }

    fn fix_yaowi(&self, table: &PrecompTable, k: &Scalar) -> Point {
        // Base-2^e digits of k.
        let digits: Vec<usize> = (0..table.pts.len())
            .map(|i| {
                let mut d = 0usize;
                for r in 0..DEPTH {
                    d |= (k.bit(i * DEPTH + r) as usize) << r;
                }
                d
            })
            .collect();
        // Yao aggregation: descend through bucket values.
        let mut sum = Point::INFINITY;
        let mut acc = Point::INFINITY;
        for u in (1..1usize << DEPTH).rev() {
            for (i, &d) in digits.iter().enumerate() {
                if d == u {
                    sum = self.add(&sum, &table.pts[i]);
                }
            }
            acc = self.add(&acc, &sum);
        }
        self.norm(&acc)
    }

    fn fix_nafwi(&self, table: &PrecompTable, k: &Scalar) -> Point {
        let naf = k.naf(2);
        // Signed base-2^e digits assembled from NAF chunks.
        let chunks = (naf.len() + DEPTH - 1) / DEPTH;
        let mut digits = Vec::with_capacity(chunks);
        for i in 0..chunks {
            let mut v = 0i64;
            for r in (0..DEPTH).rev() {
                let d = naf.get(i * DEPTH + r).copied().unwrap_or(0);
                v = (v << 1) + d as i64;
            }
            digits.push(v);
        }
        debug_assert!(digits.len() <= table.pts.len());
        let mut sum = Point::INFINITY;
        let mut acc = Point::INFINITY;
        for u in (1..1i64 << DEPTH).rev() {
            for (i, &v) in digits.iter().enumerate() {
                if v == u {
                    sum = self.add(&sum, &table.pts[i]);
                } else if v == -u {
                    sum = self.add(&sum, &self.neg(&table.pts[i]));
                }
            }
            acc = self.add(&acc, &sum);
        }
        self.norm(&acc)
    }

    fn fix_combs(&self, table: &PrecompTable, k: &Scalar) -> Point {
        let d = table.span;
        let mut r = Point::INFINITY;
        for i in (0..d).rev() {
            r = self.dbl(&r);
            let mut u = 0usize;
            for j in 0..DEPTH {
                u |= (k.bit(j * d + i) as usize) << j;
            }
            if u != 0 {
                r = self.add(&r, &table.pts[u]);
            }
        }
        self.norm(&r)
    }

    fn fix_combd(&self, table: &PrecompTable, k: &Scalar) -> Point {
        let d = table.span;
        let half = (d + 1) / 2;
        let lo = &table.pts[..1 << DEPTH];
        let hi = &table.pts[1 << DEPTH..];
        let mut r = Point::INFINITY;
        for i in (0..half).rev() {
            r = self.dbl(&r);
            let mut u0 = 0usize;
            let mut u1 = 0usize;
            for j in 0..DEPTH {
                u0 |= (k.bit(j * d + i) as usize) << j;
                if i + half < d {
                    u1 |= (k.bit(j * d + i + half) as usize) << j;
                }
            }
            if u0 != 0 {
                r = self.add(&r, &lo[u0]);
            }
            if u1 != 0 {
                r = self.add(&r, &hi[u1]);
            }
        }
        self.norm(&r)
    }

    fn fix_wtnaf(&self, table: &PrecompTable, k: &Scalar) -> Point {
        let signed = |d: i8| {
            let entry = table.pts[(d.unsigned_abs() as usize - 1) / 2];
            if d > 0 {
                entry
            } else {
                self.neg(&entry)
            }
        };
        match self.family {
            Family::Koblitz => {
                let tau = self.tau.as_ref().expect("Koblitz context");
                let digits = tau.wtnaf(k, crate::mul::WINDOW);
                let mut r = Point::INFINITY;
                for &d in digits.iter().rev() {
                    r = self.frb(&r);
                    if d != 0 {
                        r = self.add(&r, &signed(d));
                    }
                }
                self.norm(&r)
            }
            Family::Ordinary | Family::Supersingular => {
                let digits = k.naf(crate::mul::WINDOW);
                let mut r = Point::INFINITY;
                for &d in digits.iter().rev() {
                    r = self.dbl(&r);
                    if d != 0 {
                        r = self.add(&r, &signed(d));
                    }
                }
                self.norm(&r)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Prng;
    use crate::CurveId;

    const ALGS: [FixAlg; 6] = [
        FixAlg::Basic,
        FixAlg::Yaowi,
        FixAlg::Nafwi,
        FixAlg::Combs,
        FixAlg::Combd,
        FixAlg::Wtnaf,
    ];

    #[test]
    fn every_builder_consumer_pair_matches_variable_mul() {
        for id in [CurveId::NistB163, CurveId::NistK163] {
            let curve = Curve::from_id(id).unwrap();
            let mut rng = Prng::from_seed(b"fix-pairs");
            let p = curve.rand(&mut rng);
            let tables: Vec<_> = ALGS.iter().map(|&a| curve.mul_pre(a, &p)).collect();
            for _ in 0..3 {
                let k = Scalar::rand_mod(&curve.n, &mut rng);
                let expect = curve.mul(&p, &k);
                for table in &tables {
                    let got = curve.mul_fix(table, &k);
                    assert!(
                        curve.point_eq(&got, &expect),
                        "{id:?} {:?}",
                        table.alg
                    );
                }
            }
        }
    }

    #[test]
    fn fixed_point_on_b233_with_seeded_scalar() {
        // End-to-end scenario: fixed-point table on NIST B-233.
        let curve = Curve::from_id(CurveId::NistB233).unwrap();
        let mut rng = Prng::from_seed(b"0123456789ABCDEF");
        let p = curve.gen;
        let table = curve.mul_pre(FixAlg::Combs, &p);
        let k = Scalar::rand_mod(&curve.n, &mut rng);
        assert!(curve.point_eq(&curve.mul_fix(&table, &k), &curve.mul(&p, &k)));
    }

    #[test]
    fn table_sizes_match_their_shapes() {
        let curve = Curve::from_id(CurveId::NistB163).unwrap();
        let p = curve.gen;
        assert_eq!(curve.mul_pre(FixAlg::Basic, &p).pts.len(), curve.n.bits());
        assert_eq!(curve.mul_pre(FixAlg::Combs, &p).pts.len(), 1 << DEPTH);
        assert_eq!(
            curve.mul_pre(FixAlg::Combd, &p).pts.len(),
            1 << (DEPTH + 1)
        );
        assert_eq!(curve.mul_pre(FixAlg::Wtnaf, &p).pts.len(), 4);
    }

    #[test]
    fn generator_table_is_cached_and_correct() {
        let curve = Curve::from_id(CurveId::NistK233).unwrap();
        let mut rng = Prng::from_seed(b"fix-gen");
        let k = Scalar::rand_mod(&curve.n, &mut rng);
        let via_gen = curve.mul_gen(&k);
        let via_mul = curve.mul(&curve.gen, &k);
        assert!(curve.point_eq(&via_gen, &via_mul));
        // Second call reuses the cached table.
        let again = curve.mul_gen(&k);
        assert!(curve.point_eq(&again, &via_gen));
    }

    #[test]
    fn zero_scalar_and_infinity_base() {
        let curve = Curve::from_id(CurveId::NistB163).unwrap();
        for alg in ALGS {
            let table = curve.mul_pre(alg, &curve.gen);
            assert!(curve.mul_fix(&table, &Scalar::zero()).is_infinity());
            let inf_table = curve.mul_pre(alg, &Point::INFINITY);
            let k = Scalar::from_u64(5);
            assert!(curve.mul_fix(&inf_table, &k).is_infinity(), "{alg:?}");
        }
    }
}
