//! Conversions and closed-form reference values used when setting up and
//! checking SIR scenarios.

use roots::{find_root_brent, SimpleConvergency};

use crate::error::SirError;

/// Probability that an exponential clock with the given `rate` fires within
/// `duration`.
#[must_use]
pub fn rate_to_proportion(rate: f64, duration: f64) -> f64 {
    -(-rate * duration).exp_m1()
}

/// Inverse of [`rate_to_proportion`]: the rate whose exponential clock fires
/// within `duration` with probability `proportion`.
#[must_use]
pub fn proportion_to_rate(proportion: f64, duration: f64) -> f64 {
    -(-proportion).ln_1p() / duration
}

/// The fraction of a large, initially fully susceptible population that is
/// ever infected in a deterministic SIR epidemic with the given basic
/// reproduction number, i.e. the positive root of `z = 1 - exp(-r0 z)`.
///
/// Returns `0.0` when `r0 <= 1`.
///
/// # Errors
///
/// Returns a `SirError::ConfigurationError` if `r0` is negative or not
/// finite, or if the root cannot be bracketed.
pub fn final_size(r0: f64) -> Result<f64, SirError> {
    if !(r0.is_finite() && r0 >= 0.0) {
        return Err(SirError::configuration(
            "r0",
            format!("must be finite and non-negative, got {r0}"),
        ));
    }
    if r0 <= 1.0 {
        return Ok(0.0);
    }
    // 1 - z - exp(-r0 z) is positive at z = 1 - 1/r0 and negative at z = 1
    let lower = 1.0 - 1.0 / r0;
    let mut convergency = SimpleConvergency {
        eps: 1e-12f64,
        max_iter: 200,
    };
    find_root_brent(
        lower,
        1.0,
        |z: f64| 1.0 - z - (-r0 * z).exp(),
        &mut convergency,
    )
    .map_err(|error| SirError::configuration("r0", format!("final size not found: {error:?}")))
}
