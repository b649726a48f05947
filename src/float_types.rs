// Re-export parry for the appropriate float size
#[cfg(feature = "f64")]
pub use parry3d_f64 as parry3d;

#[cfg(feature = "f32")]
pub use parry3d;

// Our Real scalar type:
#[cfg(feature = "f32")]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;

use core::str::FromStr;
use std::sync::OnceLock;

/// Fixed geometric epsilon used for denominator guards and cheap inner-loop
/// comparisons. Coarser policy decisions (plane equivalence, area thresholds)
/// go through [`tolerance`] instead.
#[cfg(feature = "f32")]
pub const EPSILON: Real = 1e-4;
/// Fixed geometric epsilon used for denominator guards and cheap inner-loop
/// comparisons. Coarser policy decisions (plane equivalence, area thresholds)
/// go through [`tolerance`] instead.
#[cfg(feature = "f64")]
pub const EPSILON: Real = 1e-5;

/// Lazily-initialized tolerance used across the crate.
/// Defaults depend on precision (`f32` vs `f64`), but can be overridden:
///  1) **Build-time**: set env var `BRUSHCSG_TOLERANCE` (e.g. `BRUSHCSG_TOLERANCE=1e-6 cargo build`)
///  2) **Runtime**: call [`set_tolerance`] once before using the library
static TOLERANCE_CELL: OnceLock<Real> = OnceLock::new();

/// Returns the current tolerance value.
/// If not set yet, it tries `BRUSHCSG_TOLERANCE` (parsed as the active `Real`)
/// and falls back to [`EPSILON`].
pub fn tolerance() -> Real {
    *TOLERANCE_CELL.get_or_init(|| {
        // Compile-time env if provided, inherited by dependencies
        if let Some(environment_variable) = option_env!("BRUSHCSG_TOLERANCE") {
            if let Ok(value) = Real::from_str(environment_variable) {
                return value.max(Real::EPSILON);
            }
        }
        EPSILON
    })
}

/// Set the tolerance programmatically once (subsequent calls are ignored).
/// Call near program start: `brushcsg::float_types::set_tolerance(1e-6);`
pub fn set_tolerance(value: Real) {
    let _ = TOLERANCE_CELL.set(value.max(Real::EPSILON));
}

/// Archimedes' constant (π)
#[cfg(feature = "f32")]
pub const PI: Real = core::f32::consts::PI;
/// Archimedes' constant (π)
#[cfg(feature = "f64")]
pub const PI: Real = core::f64::consts::PI;

/// The full circle constant (τ)
#[cfg(feature = "f32")]
pub const TAU: Real = core::f32::consts::TAU;
/// The full circle constant (τ)
#[cfg(feature = "f64")]
pub const TAU: Real = core::f64::consts::TAU;
