//! Binary elliptic curves — families, parameter presets, point group law
//!
//! Three curve families share one point type and one context:
//!
//! | family | equation | Frobenius | pairing |
//! |---|---|---|---|
//! | ordinary (B) | y² + xy = x³ + ax² + b | no | no |
//! | Koblitz (K) | y² + xy = x³ + ax² + 1, a ∈ {0,1} | τ | no |
//! | supersingular | y² + cy = x³ + ax + b | — | Eta_T |
//!
//! ## Representations
//!
//! A [`Point`] is (x, y, z) plus a normalization flag; z = 0 encodes the
//! point at infinity. The projective convention follows the family:
//! ordinary curves use the (x/z², y/z³) image, Koblitz curves the
//! López–Dahab (x/z, y/z²) image, and supersingular points stay affine
//! (the pairing consumes affine coordinates and the group is only used
//! through it). Mixed-coordinate addition — one operand affine — is the
//! fast path; two fully projective operands normalize the second and run
//! the mixed formulas.
//!
//! ## Contexts
//!
//! [`Curve::from_id`] is the whole parameter lifecycle: field polynomial,
//! coefficients with their optimization tags, generator, order, cofactor
//! and the Koblitz τ-adic constants are all resolved at construction, and
//! the lazily built generator table dies with the value. Koblitz orders
//! and partial-reduction constants are derived from Lucas sequences; the
//! supersingular generator is derived through the curve's own
//! hash-to-point under a fixed tag.

#![forbid(unsafe_code)]

use std::cell::OnceCell;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::field::{Fb, FieldParams};
use crate::fixed::PrecompTable;
use crate::rng::Prng;
use crate::scalar::{Scalar, TauCtx};
use crate::{CurveId, Digit, Error, Result, DIGIT};

/// Curve family, deciding equation, coordinates and available endomorphisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// NIST B-curves: y² + xy = x³ + ax² + b.
    Ordinary,
    /// NIST K-curves: b = 1, a ∈ {0,1}, Frobenius endomorphism available.
    Koblitz,
    /// Supersingular pairing curves: y² + cy = x³ + ax + b.
    Supersingular,
}

/// A curve coefficient with its optimization tag, resolved at
/// parameter-set time so hot loops dispatch once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coeff {
    /// Coefficient zero: multiplication vanishes.
    Zero,
    /// Coefficient one: multiplication copies.
    One,
    /// Coefficient fits one machine word.
    Digit(Digit),
    /// Arbitrary field element.
    General(Fb),
}

impl Coeff {
    /// Classify a field element into its cheapest multiplier kind.
    pub fn tag(f: &FieldParams, v: &Fb) -> Coeff {
        if v.is_zero() {
            Coeff::Zero
        } else if *v == Fb::ONE {
            Coeff::One
        } else if f.bits(v) <= DIGIT {
            Coeff::Digit(v.limbs()[0])
        } else {
            Coeff::General(*v)
        }
    }

    /// The coefficient as a field element.
    pub fn value(&self) -> Fb {
        match self {
            Coeff::Zero => Fb::ZERO,
            Coeff::One => Fb::ONE,
            Coeff::Digit(d) => Fb::from_digit(*d),
            Coeff::General(v) => *v,
        }
    }
}

/// A point on the configured curve; z = 0 is the point at infinity.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    /// First coordinate.
    pub x: Fb,
    /// Second coordinate.
    pub y: Fb,
    /// Projective third coordinate (1 when normalized).
    pub z: Fb,
    /// True when (x, y) is the affine image and z = 1.
    pub norm: bool,
}

impl Point {
    /// The point at infinity.
    pub const INFINITY: Point = Point {
        x: Fb::ZERO,
        y: Fb::ZERO,
        z: Fb::ZERO,
        norm: true,
    };

    /// Affine constructor.
    pub fn affine(x: Fb, y: Fb) -> Point {
        Point {
            x,
            y,
            z: Fb::ONE,
            norm: true,
        }
    }

    /// True iff this is the point at infinity.
    #[inline]
    pub fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }
}

/// One fully resolved curve context.
#[derive(Debug)]
pub struct Curve {
    /// Stable identifier this context was built from.
    pub id: CurveId,
    /// Curve family.
    pub family: Family,
    /// The underlying binary field.
    pub field: FieldParams,
    /// Coefficient a with its optimization tag.
    pub a: Coeff,
    /// Coefficient b with its optimization tag.
    pub b: Coeff,
    /// Coefficient c (supersingular negation/doubling), One elsewhere.
    pub c: Coeff,
    /// Group generator, affine.
    pub gen: Point,
    /// Order of the generator.
    pub n: Scalar,
    /// Cofactor of the generator subgroup.
    pub h: u32,
    /// τ-adic context on Koblitz curves.
    pub tau: Option<TauCtx>,
    /// Lazily built precomputation table for the generator.
    pub(crate) gen_table: OnceCell<PrecompTable>,
}

// ---------------------------------------------------------------------------
// Parameter presets
// ---------------------------------------------------------------------------

struct OrdinaryPreset {
    m: usize,
    poly: (usize, usize, usize),
    b: &'static str,
    gx: &'static str,
    gy: &'static str,
    n: &'static str,
    h: u32,
}

struct KoblitzPreset {
    m: usize,
    poly: (usize, usize, usize),
    a: u32,
    gx: &'static str,
    gy: &'static str,
}

const B163: OrdinaryPreset = OrdinaryPreset {
    m: 163,
    poly: (7, 6, 3),
    b: "20A601907B8C953CA1481EB10512F78744A3205FD",
    gx: "3F0EBA16286A2D57EA0991168D4994637E8343E36",
    gy: "0D51FBC6C71A0094FA2CDD545B11C5C0C797324F1",
    n: "40000000000000000000292FE77E70C12A4234C33",
    h: 2,
};

const K163: KoblitzPreset = KoblitzPreset {
    m: 163,
    poly: (7, 6, 3),
    a: 1,
    gx: "2FE13C0537BBC11ACAA07D793DE4E6D5E5C94EEE8",
    gy: "289070FB05D38FF58321F2E800536D538CCDAA3D9",
};

const B233: OrdinaryPreset = OrdinaryPreset {
    m: 233,
    poly: (74, 0, 0),
    b: "066647EDE6C332C7F8C0923BB58213B333B20E9CE4281FE115F7D8F90AD",
    gx: "0FAC9DFCBAC8313BB2139F1BB755FEF65BC391F8B36F8F8EB7371FD558B",
    gy: "1006A08A41903350678E58528BEBF8A0BEFF867A7CA36716F7E01F81052",
    n: "1000000000000000000000000000013E974E72F8A6922031D2603CFE0D7",
    h: 2,
};

const K233: KoblitzPreset = KoblitzPreset {
    m: 233,
    poly: (74, 0, 0),
    a: 0,
    gx: "17232BA853A7E731AF129F22FF4149563A419C26BF50A4C9D6EEFAD6126",
    gy: "1DB537DECE819B7F70F555A67C427A8CD9BF18AEB9B56E0C11056FAE6A3",
};

const B283: OrdinaryPreset = OrdinaryPreset {
    m: 283,
    poly: (12, 7, 5),
    b: "27B680AC8B8596DA5A4AF8A19A0303FCA97FD7645309FA2A581485AF6263E313B79A2F5",
    gx: "5F939258DB7DD90E1934F8C70B0DFEC2EED25B8557EAC9C80E2E198F8CDBECD86B12053",
    gy: "3676854FE24141CB98FE6D4B20D02B4516FF702350EDDB0826779C813F0DF45BE8112F4",
    n: "3FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEF90399660FC938A90165B042A7CEFADB307",
    h: 2,
};

const K283: KoblitzPreset = KoblitzPreset {
    m: 283,
    poly: (12, 7, 5),
    a: 0,
    gx: "503213F78CA44883F1A3B8162F188E553CD265F23C1567A16876913B0C2AC2458492836",
    gy: "1CCDA380F1C9E318D90F95D07E5426FE87E45C0E8184698E45962364E34116177DD2259",
};

const B409: OrdinaryPreset = OrdinaryPreset {
    m: 409,
    poly: (87, 0, 0),
    b: "021A5C2C8EE9FEB5C4B9A753B7B476B7FD6422EF1F3DD674761FA99D6AC27C8A9A197B272822F6CD57A55AA4F50AE317B13545F",
    gx: "15D4860D088DDB3496B0C6064756260441CDE4AF1771D4DB01FFE5B34E59703DC255A868A1180515603AEAB60794E54BB7996A7",
    gy: "061B1CFAB6BE5F32BBFA78324ED106A7636B9C5A7BD198D0158AA4F5488D08F38514F1FDF4B4F40D2181B3681C364BA0273C706",
    n: "10000000000000000000000000000000000000000000000000001E2AAD6A612F33307BE5FA47C3C9E052F838164CD37D9A21173",
    h: 2,
};

const K409: KoblitzPreset = KoblitzPreset {
    m: 409,
    poly: (87, 0, 0),
    a: 0,
    gx: "060F05F658F49C1AD3AB1890F7184210EFD0987E307C84C27ACCFB8F9F67CC2C460189EB5AAAA62EE222EB1B35540CFE9023746",
    gy: "1E369050B7C4E42ACBA1DACBF04299C3460782F918EA427E6325165E9EA10E3DA5F6C42E9C55215AA9CA27A5863EC48D8E0286B",
};

const B571: OrdinaryPreset = OrdinaryPreset {
    m: 571,
    poly: (10, 5, 2),
    b: "02F40E7E2221F295DE297117B7F3D62F5C6A97FFCB8CEFF1CD6BA8CE4A9A18AD84FFABBD8EFA59332BE7AD6756A66E294AFD185A78FF12AA520E4DE739BACA0C7FFEFF7F2955727A",
    gx: "303001D34B856296C16C0D40D3CD7750A93D1D2955FA80AA5F40FC8DB7B2ABDBDE53950F4C0D293CDD711A35B67FB1499AE60038614F1394ABFA3B4C850D927E1E7769C8EEC2D19",
    gy: "37BF27342DA639B6DCCFFFEB73D69D78C6C27A6009CBBCA1980F8533921E8A684423E43BAB08A576291AF8F461BB2A8B3531D2F0485C19B16E2F1516E23DD3C1A4827AF1B8AC15B",
    n: "3FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE661CE18FF55987308059B186823851EC7DD9CA1161DE93D5174D66E8382E9BB2FE84E47",
    h: 2,
};

const K571: KoblitzPreset = KoblitzPreset {
    m: 571,
    poly: (10, 5, 2),
    a: 0,
    gx: "26EB7A859923FBC82189631F8103FE4AC9CA2970012D5D46024804801841CA44370958493B205E647DA304DB4CEB08CBBD1BA39494776FB988B47174DCA88C7E2945283A01C8972",
    gy: "349DC807F4FBF374F4AEADE3BCA95314DD58CEC9F307A54FFC61EFC006D8A2C9D4979C0AC44AEA74FBEBBB9F772AEDCB620B01A7BA7AF1B320430C8591984F601CD4C143EF1C7A3",
};

/// Left-pad a preset hex constant to the field's full width and parse it.
fn parse_fb(f: &FieldParams, s: &str) -> Result<Fb> {
    let want = 2 * f.serialized_len();
    debug_assert!(s.len() <= want, "preset constant wider than the field");
    let mut padded = String::with_capacity(want);
    for _ in s.len()..want {
        padded.push('0');
    }
    padded.push_str(s);
    f.read_hex(&padded.to_lowercase())
}

/// Parse a preset scalar, padding to an even nibble count.
fn parse_scalar(s: &str) -> Result<Scalar> {
    let mut padded = String::with_capacity(s.len() + 1);
    if s.len() % 2 == 1 {
        padded.push('0');
    }
    padded.push_str(s);
    Scalar::from_hex(&padded.to_lowercase())
}

impl Curve {
    /// Configure a curve context from a stable parameter identifier.
    ///
    /// One call covers the whole parameter lifecycle: field polynomial,
    /// coefficients, generator, order and derived constants are resolved
    /// here, and cached tables are released on drop.
    pub fn from_id(id: CurveId) -> Result<Curve> {
        let curve = match id {
            CurveId::NistB163 => Self::ordinary(id, &B163)?,
            CurveId::NistK163 => Self::koblitz(id, &K163)?,
            CurveId::NistB233 => Self::ordinary(id, &B233)?,
            CurveId::NistK233 => Self::koblitz(id, &K233)?,
            CurveId::NistB283 => Self::ordinary(id, &B283)?,
            CurveId::NistK283 => Self::koblitz(id, &K283)?,
            CurveId::NistB409 => Self::ordinary(id, &B409)?,
            CurveId::NistK409 => Self::koblitz(id, &K409)?,
            CurveId::NistB571 => Self::ordinary(id, &B571)?,
            CurveId::NistK571 => Self::koblitz(id, &K571)?,
            CurveId::EtaS271 => Self::supersingular(id, 271, (207, 175, 111))?,
            CurveId::EtaS1223 => Self::supersingular(id, 1223, (255, 0, 0))?,
        };
        debug!(
            id = id.wire(),
            m = curve.field.m,
            family = ?curve.family,
            "curve context configured"
        );
        Ok(curve)
    }

    /// Configure a curve context from a raw wire identifier.
    pub fn from_wire(id: u32) -> Result<Curve> {
        Curve::from_id(CurveId::from_wire(id)?)
    }

    fn ordinary(id: CurveId, p: &OrdinaryPreset) -> Result<Curve> {
        let field = FieldParams::new(p.m, p.poly.0, p.poly.1, p.poly.2)?;
        let b = parse_fb(&field, p.b)?;
        let gx = parse_fb(&field, p.gx)?;
        let gy = parse_fb(&field, p.gy)?;
        let curve = Curve {
            id,
            family: Family::Ordinary,
            a: Coeff::One,
            b: Coeff::tag(&field, &b),
            c: Coeff::One,
            gen: Point::affine(gx, gy),
            n: parse_scalar(p.n)?,
            h: p.h,
            tau: None,
            field,
            gen_table: OnceCell::new(),
        };
        debug_assert!(curve.on_curve(&curve.gen));
        Ok(curve)
    }

    fn koblitz(id: CurveId, p: &KoblitzPreset) -> Result<Curve> {
        let field = FieldParams::new(p.m, p.poly.0, p.poly.1, p.poly.2)?;
        let gx = parse_fb(&field, p.gx)?;
        let gy = parse_fb(&field, p.gy)?;
        let tau = TauCtx::new(p.m, p.a);
        let curve = Curve {
            id,
            family: Family::Koblitz,
            a: if p.a == 0 { Coeff::Zero } else { Coeff::One },
            b: Coeff::One,
            c: Coeff::One,
            gen: Point::affine(gx, gy),
            n: tau.n.clone(),
            h: tau.h,
            tau: Some(tau),
            field,
            gen_table: OnceCell::new(),
        };
        debug_assert!(curve.on_curve(&curve.gen));
        Ok(curve)
    }

    /// Supersingular context: y² + y = x³ + x over GF(2^m), m ≡ 7 (mod 8),
    /// with the full curve order 2^m + 2^((m+1)/2) + 1 and a generator
    /// derived through hash-to-point under a fixed tag.
    fn supersingular(id: CurveId, m: usize, poly: (usize, usize, usize)) -> Result<Curve> {
        debug_assert_eq!(m % 8, 7, "Eta_T presets assume m ≡ 7 (mod 8)");
        let field = FieldParams::new(m, poly.0, poly.1, poly.2)?;
        let order = power_of_two(m)
            .add(&power_of_two((m + 1) / 2))
            .add(&Scalar::from_u64(1));
        let mut curve = Curve {
            id,
            family: Family::Supersingular,
            a: Coeff::One,
            b: Coeff::Zero,
            c: Coeff::One,
            gen: Point::INFINITY,
            n: order,
            h: 1,
            tau: None,
            field,
            gen_table: OnceCell::new(),
        };
        curve.gen = curve.map(b"tinypair-eta-generator-v1")?;
        Ok(curve)
    }

    // ------------------------------------------------------------------
    // Predicates and conversions
    // ------------------------------------------------------------------

    /// True iff `p` satisfies the configured curve equation.
    pub fn on_curve(&self, p: &Point) -> bool {
        if p.is_infinity() {
            return true;
        }
        let f = &self.field;
        let p = self.norm(p);
        let x2 = f.sqr(&p.x);
        match self.family {
            Family::Ordinary | Family::Koblitz => {
                // y² + xy = x³ + ax² + b
                let lhs = f.add(&f.sqr(&p.y), &f.mul(&p.x, &p.y));
                let rhs = f.add(
                    &f.add(&f.mul(&x2, &p.x), &self.coeff_mul(&x2, &self.a)),
                    &self.b.value(),
                );
                lhs == rhs
            }
            Family::Supersingular => {
                // y² + cy = x³ + ax + b
                let lhs = f.add(&f.sqr(&p.y), &self.coeff_mul(&p.y, &self.c));
                let rhs = f.add(
                    &f.add(&f.mul(&x2, &p.x), &self.coeff_mul(&p.x, &self.a)),
                    &self.b.value(),
                );
                lhs == rhs
            }
        }
    }

    /// Convert to affine coordinates; z = 0 normalizes to infinity.
    pub fn norm(&self, p: &Point) -> Point {
        if p.is_infinity() {
            return Point::INFINITY;
        }
        if p.norm {
            return *p;
        }
        let f = &self.field;
        let zi = f.inv(&p.z).expect("nonzero z is invertible");
        match self.family {
            Family::Ordinary => {
                let zi2 = f.sqr(&zi);
                Point::affine(f.mul(&p.x, &zi2), f.mul(&p.y, &f.mul(&zi2, &zi)))
            }
            Family::Koblitz => {
                let zi2 = f.sqr(&zi);
                Point::affine(f.mul(&p.x, &zi), f.mul(&p.y, &zi2))
            }
            Family::Supersingular => {
                debug_assert!(p.norm, "supersingular points stay affine");
                *p
            }
        }
    }

    /// Equality after normalization.
    pub fn point_eq(&self, p: &Point, q: &Point) -> bool {
        match (p.is_infinity(), q.is_infinity()) {
            (true, true) => true,
            (true, false) | (false, true) => false,
            (false, false) => {
                let p = self.norm(p);
                let q = self.norm(q);
                p.x == q.x && p.y == q.y
            }
        }
    }

    /// Multiply a field element by a tagged coefficient.
    #[inline]
    pub(crate) fn coeff_mul(&self, v: &Fb, coeff: &Coeff) -> Fb {
        let f = &self.field;
        match coeff {
            Coeff::Zero => Fb::ZERO,
            Coeff::One => *v,
            Coeff::Digit(d) => f.mul_digit(v, *d),
            Coeff::General(w) => f.mul(v, w),
        }
    }

    // ------------------------------------------------------------------
    // Group law
    // ------------------------------------------------------------------

    /// R = −P: (x, y+x) on ordinary/Koblitz curves, (x, y+c) on
    /// supersingular ones. Works on projective inputs in both conventions.
    pub fn neg(&self, p: &Point) -> Point {
        if p.is_infinity() {
            return Point::INFINITY;
        }
        let f = &self.field;
        match self.family {
            Family::Ordinary | Family::Koblitz => {
                // Affine y ↦ x + y lifts to Y ↦ X·Z + Y in both conventions.
                let y = if p.norm {
                    f.add(&p.x, &p.y)
                } else {
                    f.add(&f.mul(&p.x, &p.z), &p.y)
                };
                Point { y, ..*p }
            }
            Family::Supersingular => {
                let y = f.add(&p.y, &self.c.value());
                Point { y, ..*p }
            }
        }
    }

    /// R = 2P.
    pub fn dbl(&self, p: &Point) -> Point {
        if p.is_infinity() {
            return Point::INFINITY;
        }
        let f = &self.field;
        match self.family {
            Family::Ordinary => {
                // (x/z², y/z³) doubling; D = 0 catches both z = 0 and the
                // order-2 point x = 0.
                let z = if p.norm { Fb::ONE } else { p.z };
                let d = f.mul(&p.x, &f.sqr(&z));
                if d.is_zero() {
                    return Point::INFINITY;
                }
                let a = f.add(&f.sqr(&p.x), &f.mul(&p.y, &z));
                let x3 = f.add(
                    &f.add(&f.sqr(&a), &f.mul(&a, &d)),
                    &self.coeff_mul(&f.sqr(&d), &self.a),
                );
                let x14 = f.sqr(&f.sqr(&p.x));
                let y3 = f.add(&f.mul(&x14, &d), &f.mul(&f.add(&a, &d), &x3));
                Point {
                    x: x3,
                    y: y3,
                    z: d,
                    norm: false,
                }
            }
            Family::Koblitz => {
                // López–Dahab doubling; Z3 = 0 likewise absorbs x = 0.
                let z = if p.norm { Fb::ONE } else { p.z };
                let x2 = f.sqr(&p.x);
                let z2 = f.sqr(&z);
                let z3 = f.mul(&x2, &z2);
                if z3.is_zero() {
                    return Point::INFINITY;
                }
                let z4b = self.coeff_mul(&f.sqr(&z2), &self.b);
                let x3 = f.add(&f.sqr(&x2), &z4b);
                let inner = f.add(
                    &f.add(&self.coeff_mul(&z3, &self.a), &f.sqr(&p.y)),
                    &z4b,
                );
                let y3 = f.add(&f.mul(&z4b, &z3), &f.mul(&x3, &inner));
                Point {
                    x: x3,
                    y: y3,
                    z: z3,
                    norm: false,
                }
            }
            Family::Supersingular => {
                // λ = (x² + a)/c; x3 = λ²; y3 = λ(x + x3) + y + c.
                let p = self.norm(p);
                let num = f.add(&f.sqr(&p.x), &self.a.value());
                let lam = match self.c {
                    Coeff::One => num,
                    _ => f.mul(&num, &f.inv(&self.c.value()).expect("c is nonzero")),
                };
                let x3 = f.sqr(&lam);
                let y3 = f.add(
                    &f.add(&f.mul(&lam, &f.add(&p.x, &x3)), &p.y),
                    &self.c.value(),
                );
                Point::affine(x3, y3)
            }
        }
    }

    /// R = P + Q for arbitrary operands, including P = ±Q and infinity.
    pub fn add(&self, p: &Point, q: &Point) -> Point {
        if p.is_infinity() {
            return *q;
        }
        if q.is_infinity() {
            return *p;
        }
        match self.family {
            Family::Supersingular => self.add_super(&self.norm(p), &self.norm(q)),
            Family::Ordinary | Family::Koblitz => {
                if q.norm {
                    self.add_mixed(p, q)
                } else if p.norm {
                    self.add_mixed(q, p)
                } else {
                    self.add_mixed(p, &self.norm(q))
                }
            }
        }
    }

    /// R = P − Q.
    pub fn sub(&self, p: &Point, q: &Point) -> Point {
        self.add(p, &self.neg(q))
    }

    /// Mixed-coordinate addition: q must be affine.
    fn add_mixed(&self, p: &Point, q: &Point) -> Point {
        debug_assert!(q.norm);
        let f = &self.field;
        match self.family {
            Family::Ordinary => {
                let z = if p.norm { Fb::ONE } else { p.z };
                let z2 = f.sqr(&z);
                let b = f.add(&p.x, &f.mul(&q.x, &z2));
                let a = f.add(&p.y, &f.mul(&q.y, &f.mul(&z2, &z)));
                if b.is_zero() {
                    return if a.is_zero() {
                        self.dbl(p)
                    } else {
                        Point::INFINITY
                    };
                }
                let d = f.mul(&z, &b);
                let b2 = f.sqr(&b);
                let x3 = f.add(
                    &f.add(&f.add(&f.sqr(&a), &f.mul(&a, &d)), &f.mul(&b2, &b)),
                    &self.coeff_mul(&f.sqr(&d), &self.a),
                );
                let y3 = f.add(
                    &f.add(
                        &f.mul(&a, &f.add(&f.mul(&p.x, &b2), &x3)),
                        &f.mul(&x3, &d),
                    ),
                    &f.mul(&p.y, &f.mul(&b2, &b)),
                );
                Point {
                    x: x3,
                    y: y3,
                    z: d,
                    norm: false,
                }
            }
            Family::Koblitz => {
                // López–Dahab mixed addition.
                let z = if p.norm { Fb::ONE } else { p.z };
                let z2 = f.sqr(&z);
                let a = f.add(&f.mul(&q.y, &z2), &p.y);
                let b = f.add(&f.mul(&q.x, &z), &p.x);
                if b.is_zero() {
                    return if a.is_zero() {
                        self.dbl(p)
                    } else {
                        Point::INFINITY
                    };
                }
                let c = f.mul(&z, &b);
                let d = f.mul(
                    &f.sqr(&b),
                    &f.add(&c, &self.coeff_mul(&z2, &self.a)),
                );
                let z3 = f.sqr(&c);
                let e = f.mul(&a, &c);
                let x3 = f.add(&f.add(&f.sqr(&a), &d), &e);
                let fr = f.add(&x3, &f.mul(&q.x, &z3));
                let g = f.mul(&f.add(&q.x, &q.y), &f.sqr(&z3));
                let y3 = f.add(&f.mul(&f.add(&e, &z3), &fr), &g);
                Point {
                    x: x3,
                    y: y3,
                    z: z3,
                    norm: false,
                }
            }
            Family::Supersingular => self.add_super(&self.norm(p), q),
        }
    }

    /// Affine supersingular addition.
    fn add_super(&self, p: &Point, q: &Point) -> Point {
        let f = &self.field;
        if p.x == q.x {
            return if p.y == q.y {
                self.dbl(p)
            } else {
                // The only other y sharing this x is y + c: q = −p.
                Point::INFINITY
            };
        }
        let dx = f.add(&p.x, &q.x);
        let lam = f.mul(
            &f.add(&p.y, &q.y),
            &f.inv(&dx).expect("distinct x-coordinates"),
        );
        let x3 = f.add(&f.add(&f.sqr(&lam), &p.x), &q.x);
        let y3 = f.add(
            &f.add(&f.mul(&lam, &f.add(&p.x, &x3)), &p.y),
            &self.c.value(),
        );
        Point::affine(x3, y3)
    }

    /// Frobenius endomorphism τ(P) = (x², y²) on Koblitz curves.
    pub fn frb(&self, p: &Point) -> Point {
        debug_assert_eq!(
            self.family,
            Family::Koblitz,
            "Frobenius endomorphism is only defined on Koblitz curves"
        );
        if p.is_infinity() {
            return Point::INFINITY;
        }
        let f = &self.field;
        Point {
            x: f.sqr(&p.x),
            y: f.sqr(&p.y),
            z: if p.norm { p.z } else { f.sqr(&p.z) },
            norm: p.norm,
        }
    }

    // ------------------------------------------------------------------
    // Hash-to-point and randomization
    // ------------------------------------------------------------------

    /// Deterministically map a byte string to a curve point.
    ///
    /// The SHA-256 digest of the message seeds an x-coordinate; x is
    /// incremented until the curve equation has a solution in y, which is
    /// recovered through the half-trace solver.
    pub fn map(&self, msg: &[u8]) -> Result<Point> {
        let f = &self.field;
        let digest = Sha256::digest(msg);
        let len = f.serialized_len();
        let mut bytes = vec![0u8; len];
        if len >= digest.len() {
            bytes[len - digest.len()..].copy_from_slice(&digest);
        } else {
            bytes.copy_from_slice(&digest[..len]);
        }
        // Clamp below 2^m so the encoding parses.
        let top_bits = f.m % 8;
        if top_bits != 0 {
            bytes[0] &= (1u8 << top_bits) - 1;
        }
        let mut x = f.read_bytes(&bytes)?;

        loop {
            if let Some(p) = self.lift_x(&x) {
                debug_assert!(self.on_curve(&p));
                return Ok(p);
            }
            x = increment(f, &x);
        }
    }

    /// Try to solve the curve equation at `x`.
    fn lift_x(&self, x: &Fb) -> Option<Point> {
        let f = &self.field;
        match self.family {
            Family::Ordinary | Family::Koblitz => {
                let rhs = f.add(
                    &f.add(
                        &f.mul(&f.sqr(x), x),
                        &self.coeff_mul(&f.sqr(x), &self.a),
                    ),
                    &self.b.value(),
                );
                if x.is_zero() {
                    // y² = b at the 2-torsion abscissa.
                    return Some(Point::affine(*x, f.srt(&self.b.value())));
                }
                // Substitute y = xz: z² + z = rhs / x².
                let xi2 = f.sqr(&f.inv(x).ok()?);
                let w = f.mul(&rhs, &xi2);
                let z = f.quad_solve(&w)?;
                Some(Point::affine(*x, f.mul(x, &z)))
            }
            Family::Supersingular => {
                // (y/c)² + (y/c) = rhs/c².
                let rhs = f.add(
                    &f.add(&f.mul(&f.sqr(x), x), &self.coeff_mul(x, &self.a)),
                    &self.b.value(),
                );
                let (w, scale) = match self.c {
                    Coeff::One => (rhs, None),
                    _ => {
                        let ci = f.inv(&self.c.value()).ok()?;
                        (f.mul(&rhs, &f.sqr(&ci)), Some(self.c.value()))
                    }
                };
                let z = f.quad_solve(&w)?;
                let y = match scale {
                    None => z,
                    Some(c) => f.mul(&z, &c),
                };
                Some(Point::affine(*x, y))
            }
        }
    }

    /// Uniform point: a fresh scalar in [1, n) times the generator.
    pub fn rand(&self, rng: &mut Prng) -> Point {
        let mut k = Scalar::rand_mod(&self.n, rng);
        while k.is_zero() {
            k = Scalar::rand_mod(&self.n, rng);
        }
        self.mul_gen(&k)
    }

    // ------------------------------------------------------------------
    // Point serialization
    // ------------------------------------------------------------------

    /// Serialize an affine point as x ‖ y (big-endian halves).
    ///
    /// The point at infinity is an internal value and is not serialized.
    pub fn point_to_bytes(&self, p: &Point, out: &mut [u8]) -> Result<()> {
        if p.is_infinity() {
            return Err(Error::Invalid("the point at infinity is not serialized"));
        }
        let len = self.field.serialized_len();
        if out.len() < 2 * len {
            return Err(Error::BufferTooSmall {
                need: 2 * len,
                got: out.len(),
            });
        }
        let p = self.norm(p);
        self.field.write_bytes(&p.x, &mut out[..len])?;
        self.field.write_bytes(&p.y, &mut out[len..2 * len])?;
        Ok(())
    }

    /// Parse a point serialized by `point_to_bytes`, validating membership.
    pub fn point_from_bytes(&self, bytes: &[u8]) -> Result<Point> {
        let len = self.field.serialized_len();
        if bytes.len() != 2 * len {
            return Err(Error::Invalid("point encoding has wrong length"));
        }
        let x = self.field.read_bytes(&bytes[..len])?;
        let y = self.field.read_bytes(&bytes[len..])?;
        let p = Point::affine(x, y);
        if !self.on_curve(&p) {
            return Err(Error::Invalid("point is not on the configured curve"));
        }
        Ok(p)
    }
}

/// 2^e as a scalar.
fn power_of_two(e: usize) -> Scalar {
    let mut bytes = vec![0u8; e / 8 + 1];
    bytes[0] = 1 << (e % 8);
    Scalar::from_bytes_be(&bytes)
}

/// x + 1 as an integer, wrapping inside the field's bit width.
fn increment(f: &FieldParams, x: &Fb) -> Fb {
    let mut c = *x;
    for i in 0..f.limbs {
        let (v, carry) = c.0[i].overflowing_add(1);
        c.0[i] = v;
        if !carry {
            break;
        }
    }
    c.0[f.limbs - 1] &= f.top_mask();
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_constructs_with_generator_on_curve() {
        for id in CurveId::ALL {
            let curve = Curve::from_id(id).unwrap();
            assert!(curve.on_curve(&curve.gen), "{id:?}");
            assert!(!curve.gen.is_infinity(), "{id:?}");
            assert!(curve.n.bits() >= curve.field.m - 2, "{id:?}");
        }
    }

    #[test]
    fn polynomial_presets_are_exact() {
        let expected = [
            (CurveId::NistB163, (163, 7, 6, 3)),
            (CurveId::NistK163, (163, 7, 6, 3)),
            (CurveId::NistB233, (233, 74, 0, 0)),
            (CurveId::NistK233, (233, 74, 0, 0)),
            (CurveId::NistB283, (283, 12, 7, 5)),
            (CurveId::NistK283, (283, 12, 7, 5)),
            (CurveId::NistB409, (409, 87, 0, 0)),
            (CurveId::NistK409, (409, 87, 0, 0)),
            (CurveId::NistB571, (571, 10, 5, 2)),
            (CurveId::NistK571, (571, 10, 5, 2)),
            (CurveId::EtaS271, (271, 207, 175, 111)),
            (CurveId::EtaS1223, (1223, 255, 0, 0)),
        ];
        for (id, (m, a, b, c)) in expected {
            let curve = Curve::from_id(id).unwrap();
            let f = &curve.field;
            assert_eq!((f.m, f.fa, f.fb, f.fc), (m, a, b, c), "{id:?}");
        }
    }

    #[test]
    fn negation_is_involutive_and_addition_has_inverse() {
        for id in [CurveId::NistB163, CurveId::NistK233, CurveId::EtaS271] {
            let curve = Curve::from_id(id).unwrap();
            let mut rng = Prng::from_seed(b"curve-neg");
            for _ in 0..10 {
                let p = curve.rand(&mut rng);
                let np = curve.neg(&p);
                assert!(!curve.point_eq(&p, &np), "{id:?}");
                assert!(curve.point_eq(&p, &curve.neg(&np)), "{id:?}");
                assert!(curve.add(&p, &np).is_infinity(), "{id:?}");
            }
        }
    }

    #[test]
    fn addition_group_laws() {
        for id in [CurveId::NistB163, CurveId::NistK163, CurveId::EtaS271] {
            let curve = Curve::from_id(id).unwrap();
            let mut rng = Prng::from_seed(b"curve-laws");
            for _ in 0..10 {
                let p = curve.rand(&mut rng);
                let q = curve.rand(&mut rng);
                let r = curve.rand(&mut rng);
                // Commutativity.
                assert!(curve.point_eq(&curve.add(&p, &q), &curve.add(&q, &p)));
                // Associativity.
                let pq_r = curve.add(&curve.add(&p, &q), &r);
                let p_qr = curve.add(&p, &curve.add(&q, &r));
                assert!(curve.point_eq(&pq_r, &p_qr), "{id:?}");
                // Identity.
                assert!(curve.point_eq(&curve.add(&p, &Point::INFINITY), &p));
                assert!(curve.point_eq(&curve.add(&Point::INFINITY, &p), &p));
                // Doubling agrees with self-addition.
                assert!(curve.point_eq(&curve.dbl(&p), &curve.add(&p, &p)));
                // Subtraction undoes addition.
                assert!(curve.point_eq(&curve.sub(&curve.add(&p, &q), &q), &p));
            }
        }
    }

    #[test]
    fn projective_and_affine_agree() {
        for id in [CurveId::NistB233, CurveId::NistK283] {
            let curve = Curve::from_id(id).unwrap();
            let mut rng = Prng::from_seed(b"curve-proj");
            for _ in 0..10 {
                let p = curve.rand(&mut rng);
                let q = curve.rand(&mut rng);
                // Drive p out of affine form first.
                let pp = curve.add(&curve.dbl(&p), &q);
                assert!(!pp.norm || pp.is_infinity());
                let qq = curve.dbl(&q);
                // Fully projective vs normalized operands.
                let lhs = curve.add(&pp, &qq);
                let rhs = curve.add(&curve.norm(&pp), &curve.norm(&qq));
                assert!(curve.point_eq(&lhs, &rhs), "{id:?}");
                // Mixed vs projective.
                let mixed = curve.add(&pp, &curve.norm(&qq));
                assert!(curve.point_eq(&mixed, &lhs), "{id:?}");
                // Results are on the curve.
                assert!(curve.on_curve(&lhs), "{id:?}");
            }
        }
    }

    #[test]
    fn frobenius_fixes_the_curve_on_koblitz() {
        let curve = Curve::from_id(CurveId::NistK163).unwrap();
        let mut rng = Prng::from_seed(b"curve-frb");
        for _ in 0..10 {
            let p = curve.rand(&mut rng);
            let fp = curve.frb(&p);
            assert!(curve.on_curve(&fp));
            // τ² − μτ + 2 = 0: check τ(τP) + 2P = μ·τP.
            let t2 = curve.frb(&fp);
            let two_p = curve.dbl(&p);
            let lhs = curve.add(&t2, &two_p);
            let mu = curve.tau.as_ref().unwrap().mu;
            let rhs = if mu == 1 { fp } else { curve.neg(&fp) };
            assert!(curve.point_eq(&lhs, &rhs));
        }
    }

    #[test]
    fn map_is_deterministic_and_lands_on_curve() {
        for id in [CurveId::NistB163, CurveId::NistK233, CurveId::EtaS271] {
            let curve = Curve::from_id(id).unwrap();
            let p = curve.map(b"some message").unwrap();
            let q = curve.map(b"some message").unwrap();
            let r = curve.map(b"another message").unwrap();
            assert!(curve.on_curve(&p), "{id:?}");
            assert!(curve.point_eq(&p, &q), "{id:?}");
            assert!(!curve.point_eq(&p, &r), "{id:?}");
        }
    }

    #[test]
    fn hex_roundtrip_on_every_preset() {
        // End-to-end scenario: radix-16 field round-trip per polynomial.
        let mut rng = Prng::from_seed(b"hex-roundtrip");
        for id in CurveId::ALL {
            let curve = Curve::from_id(id).unwrap();
            let a = curve.field.rand(&mut rng);
            let s = curve.field.write_hex(&a);
            assert_eq!(curve.field.read_hex(&s).unwrap(), a, "{id:?}");
        }
    }

    #[test]
    fn group_law_sweep_on_every_curve() {
        // End-to-end scenario: commutativity on 100 pairs and
        // associativity on 100 triples, per curve. Points advance through
        // a cheap add/double chain seeded from hash-to-point.
        for id in CurveId::ALL {
            let curve = Curve::from_id(id).unwrap();
            let mut p = curve.map(b"sweep-p").unwrap();
            let mut q = curve.map(b"sweep-q").unwrap();
            let mut r = curve.gen;
            for round in 0..100 {
                let pq = curve.add(&p, &q);
                assert!(
                    curve.point_eq(&pq, &curve.add(&q, &p)),
                    "{id:?} round {round}"
                );
                let lhs = curve.add(&pq, &r);
                let rhs = curve.add(&p, &curve.add(&q, &r));
                assert!(curve.point_eq(&lhs, &rhs), "{id:?} round {round}");
                p = curve.dbl(&p);
                q = curve.add(&q, &p);
                r = curve.add(&r, &q);
            }
        }
    }

    #[test]
    fn point_bytes_roundtrip() {
        let curve = Curve::from_id(CurveId::NistB163).unwrap();
        let mut rng = Prng::from_seed(b"curve-io");
        let p = curve.rand(&mut rng);
        let mut buf = vec![0u8; 2 * curve.field.serialized_len()];
        curve.point_to_bytes(&p, &mut buf).unwrap();
        let back = curve.point_from_bytes(&buf).unwrap();
        assert!(curve.point_eq(&p, &back));
        assert!(curve.point_to_bytes(&Point::INFINITY, &mut buf).is_err());
        // A corrupted x lands off-curve with overwhelming probability.
        buf[0] ^= 1;
        assert!(curve.point_from_bytes(&buf).is_err());
    }
}
