//! Error types returned across the public boundary of the simulator.
//!
//! Only two kinds of failure are allowed to cross out of this crate's
//! public functions: a malformed or out-of-range patient input, and a
//! physiologically critical condition encountered while calibrating or
//! initializing state. Everything else (solver non-convergence, internal
//! bookkeeping) is handled internally or logged, never surfaced as a third
//! error variant, per the closed contract the calibrator and initializer
//! are built against.

use std::error::Error;
use std::fmt;

/// Errors that can cross the public boundary of `build_params`, `init_state`,
/// `step`, and `run`.
pub enum CoreError {
    /// A field on `PatientInput` failed a range, type, or cross-field check
    /// before any physiology could be computed.
    InvalidInput(String),
    /// The calibrator or initializer detected a condition that makes
    /// simulating the patient medically meaningless (e.g. the starting mean
    /// arterial pressure implied by the inputs is already below any
    /// survivable perfusion pressure).
    CriticalCondition(String),
    /// The initializer derived a compartment geometry that has collapsed to
    /// a non-physical volume or pressure (distinct from `CriticalCondition`:
    /// this is a numerical failure of the geometry solve, not a clinical
    /// judgment about the patient).
    DegenerateGeometry(String),
}

impl Error for CoreError {}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidInput(msg) => write!(f, "invalid patient input: {}", msg),
            CoreError::CriticalCondition(msg) => write!(f, "critical condition: {}", msg),
            CoreError::DegenerateGeometry(msg) => write!(f, "degenerate geometry: {}", msg),
        }
    }
}

impl fmt::Debug for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
