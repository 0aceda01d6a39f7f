//! Crate root: public surface, core aliases, and toolkit-wide invariants
//!
//! This module is the **single canonical entry-point** for downstream users
//! of the library. It centralizes the machine-word aliases, the curve
//! identifier enum, the shared error type, and re-exports the submodules
//! that implement the toolkit.
//!
//! ## Invariants (toolkit-wide)
//!
//! - **Field elements.** An element of GF(2^m) is a fixed array of
//!   little-endian limbs; every bit at position ≥ m is zero. Every public
//!   operation preserves this invariant; double-precision scratch vectors
//!   (`Dv`) are the only transiently unnormalized values and never escape
//!   a function.
//!
//! - **Context discipline.** All arithmetic reads its parameters from one
//!   [`Curve`] value. The context is immutable after construction apart
//!   from the lazily built generator table, which makes it deliberately
//!   not `Sync`: one thread drives a context at a time, exactly the
//!   contract the operations assume.
//!
//! - **Caller-owned values.** Operations return results by value and never
//!   hold onto inputs. Scratch buffers are stack-acquired and released on
//!   every exit path, including early error returns.
//!
//! - **Errors.** Failure modes are **precise errors** (never panics in
//!   library paths): unknown parameter ids, zero inversion, out-of-range
//!   bit indices and shifts, over-capacity polynomial degrees, short
//!   output buffers, and short random reads all surface as [`Error`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Word-level primitives shared by the field and scalar layers.
pub mod digit;
/// Binary field GF(2^m): parameters, element representation, utilities.
pub mod field;
/// GF(2^m) heavy arithmetic: multiply, square, reduce, sqrt, invert.
pub mod field_arith;
/// Quartic extension GF(2^{4m}) used by the pairing.
pub mod quartic;
/// Scalar (bignum collaborator) and signed-digit recodings.
pub mod scalar;
/// Binary elliptic curves: families, presets, point group law.
pub mod curve;
/// Variable-point and simultaneous scalar multiplication.
pub mod mul;
/// Fixed-point precomputation tables and their consumers.
pub mod fixed;
/// Eta_T pairing on supersingular binary curves.
pub mod pairing;
/// Seedable pseudo-random stream collaborator.
pub mod rng;

// ============================================================================
// Canonical aliases (centralization)
// ============================================================================

/// Machine word carrying field and scalar limbs.
///
/// The toolkit is written against [`DIGIT`] rather than a literal width, so
/// retargeting the word size is a matter of changing these aliases.
pub type Digit = u64;

/// Size of a [`Digit`] in bits.
pub const DIGIT: usize = Digit::BITS as usize;

/// Base-two logarithm of [`DIGIT`].
pub const DIGIT_LOG: usize = DIGIT.trailing_zeros() as usize;

/// Largest supported extension degree m (the ETA-S1223 preset).
pub const FB_MAX_BITS: usize = 1223;

/// Limbs in a field element: enough for the largest supported field.
pub const FB_LIMBS: usize = FB_MAX_BITS / DIGIT + 1;

/// Limbs in a double-precision scratch vector: room for any unreduced
/// product plus the slack the square-root splitter needs.
pub const DV_LIMBS: usize = 2 * FB_LIMBS + 2;

// ============================================================================
// Shared error type
// ============================================================================

/// Error categories shared by every layer of the toolkit.
///
/// The propagation policy is uniform: an error aborts the current operation
/// immediately, stack scratch unwinds with it, and the caller sees exactly
/// one status. Nothing is recovered locally inside the core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied a curve identifier outside the supported set.
    #[error("unknown curve parameter identifier {0}")]
    UnknownParam(u32),
    /// Caller supplied a structurally invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Requested polynomial degree exceeds what this build supports.
    #[error("field degree {degree} exceeds build capacity {max}")]
    PrecisionExceeded {
        /// Requested extension degree.
        degree: usize,
        /// Largest degree the build supports.
        max: usize,
    },
    /// Caller-supplied output buffer is smaller than the formatted result.
    #[error("output buffer too small: need {need} bytes, got {got}")]
    BufferTooSmall {
        /// Bytes the formatted result requires.
        need: usize,
        /// Bytes the caller supplied.
        got: usize,
    },
    /// The random stream could not produce the requested number of bytes.
    #[error("random stream ended short: requested {requested}, got {got}")]
    ReadShort {
        /// Bytes requested from the stream.
        requested: usize,
        /// Bytes actually produced.
        got: usize,
    },
}

/// Convenience alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

// ============================================================================
// Curve identifiers (wire-visible, stable)
// ============================================================================

/// Identifiers of the supported parameter sets.
///
/// The numeric values are part of the external surface and **must remain
/// stable**; reordering or renumbering them breaks wire compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CurveId {
    /// NIST B-163 ordinary curve.
    NistB163 = 1,
    /// NIST K-163 Koblitz curve.
    NistK163 = 2,
    /// NIST B-233 ordinary curve.
    NistB233 = 3,
    /// NIST K-233 Koblitz curve.
    NistK233 = 4,
    /// NIST B-283 ordinary curve.
    NistB283 = 5,
    /// NIST K-283 Koblitz curve.
    NistK283 = 6,
    /// NIST B-409 ordinary curve.
    NistB409 = 7,
    /// NIST K-409 Koblitz curve.
    NistK409 = 8,
    /// NIST B-571 ordinary curve.
    NistB571 = 9,
    /// NIST K-571 Koblitz curve.
    NistK571 = 10,
    /// 271-bit supersingular pairing curve.
    EtaS271 = 11,
    /// 1223-bit supersingular pairing curve.
    EtaS1223 = 12,
}

impl CurveId {
    /// All supported identifiers, in wire order.
    pub const ALL: [CurveId; 12] = [
        CurveId::NistB163,
        CurveId::NistK163,
        CurveId::NistB233,
        CurveId::NistK233,
        CurveId::NistB283,
        CurveId::NistK283,
        CurveId::NistB409,
        CurveId::NistK409,
        CurveId::NistB571,
        CurveId::NistK571,
        CurveId::EtaS271,
        CurveId::EtaS1223,
    ];

    /// Resolve a wire identifier; unknown values are an error.
    pub fn from_wire(id: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| *c as u32 == id)
            .ok_or(Error::UnknownParam(id))
    }

    /// The stable wire value of this identifier.
    #[inline]
    pub fn wire(self) -> u32 {
        self as u32
    }
}

// ============================================================================
// Root-level re-exports
// ============================================================================

pub use crate::curve::{Curve, Family, Point};
pub use crate::field::{Fb, FieldParams};
pub use crate::pairing::pairing;
pub use crate::quartic::Fb4;
pub use crate::rng::Prng;
pub use crate::scalar::Scalar;
