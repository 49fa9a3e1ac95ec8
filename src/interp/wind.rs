//! Wind column interpolation with a surface-layer regime.
//!
//! Target heights at or above the lowest model level use ordinary linear
//! interpolation against the column height profile. Targets below the lowest
//! level fall back to the surface layer: the logarithmic wind profile with
//! the local roughness length when one is available, otherwise a log-linear
//! regression of speed against ln(height) fitted on the low model levels.
//! Direction below the lowest level is held equal to the lowest-level
//! direction; only speed follows the log law.
//!
//! Output values are written per requested index: the i-th output always
//! corresponds to the i-th target height, regardless of which regime
//! produced it.

use tracing::debug;

use super::interp1d;
use crate::config::{DEFAULT_HEIGHT_CEILING, DEFAULT_REGRESSION_CAP};
use crate::error::{HypsoError, Result};

/// Per-column surface-layer bookkeeping
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceLayerStats {
    /// Negative extrapolated speeds clamped to zero (no-slip condition)
    pub clamped_speeds: usize,
    /// The regression had to include a level above the configured cap
    pub capped_regression: bool,
}

/// Wind speed from orthogonal components.
pub fn wind_speed(u: f64, v: f64) -> f64 {
    (u * u + v * v).sqrt()
}

/// Least-squares fit of speed against ln(height): returns (slope, intercept).
fn fit_log_line(heights: &[f64], speeds: &[f64]) -> (f64, f64) {
    debug_assert!(heights.len() >= 2);
    let n = heights.len() as f64;
    let mean_x = heights.iter().map(|z| z.ln()).sum::<f64>() / n;
    let mean_y = speeds.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (&z, &s) in heights.iter().zip(speeds.iter()) {
        let dx = z.ln() - mean_x;
        cov += dx * (s - mean_y);
        var += dx * dx;
    }

    if var <= f64::EPSILON {
        return (0.0, mean_y);
    }
    let slope = cov / var;
    (slope, mean_y - slope * mean_x)
}

/// Evaluate the fitted log line at the requested heights, clamping negative
/// or non-finite speeds to zero. Returns the speeds and the clamp count.
fn regress_log_speeds(
    speeds: &[f64],
    heights: &[f64],
    z_interp: &[f64],
    z_max: f64,
) -> (Vec<f64>, usize) {
    let mut fit_z = Vec::new();
    let mut fit_s = Vec::new();
    for (&z, &s) in heights.iter().zip(speeds.iter()) {
        if z <= z_max {
            fit_z.push(z);
            fit_s.push(s);
        }
    }
    debug_assert!(fit_z.len() >= 2, "regression needs at least two levels");

    let (slope, intercept) = fit_log_line(&fit_z, &fit_s);

    let mut clamped = 0;
    let interp = z_interp
        .iter()
        .map(|&z| {
            let s = slope * z.ln() + intercept;
            if s.is_finite() && s >= 0.0 {
                s
            } else {
                clamped += 1;
                0.0
            }
        })
        .collect();
    (interp, clamped)
}

/// Log-linear interpolation of ln(height) versus wind speed.
///
/// Fits a regression through all levels at or below `z_max` (default 100 m)
/// and evaluates it at `z_interp`. Negative extrapolated speeds are reset to
/// zero to honor the no-slip condition at the ground; the reset count is
/// returned alongside the speeds.
pub fn log_law_interp(
    speed: &[f64],
    z: &[f64],
    z_interp: &[f64],
    z_max: Option<f64>,
) -> Result<(Vec<f64>, usize)> {
    let max_target = z_interp.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_target > DEFAULT_HEIGHT_CEILING && z_max.is_none() {
        return Err(HypsoError::Config {
            message: format!(
                "Cannot interpolate above {} m unless z_max is explicitly set",
                DEFAULT_HEIGHT_CEILING
            ),
        });
    }
    let z_max = z_max.unwrap_or(DEFAULT_REGRESSION_CAP);

    if speed.iter().any(|&s| s < 0.0)
        || z.iter().any(|&h| h < 0.0)
        || z_interp.iter().any(|&h| h < 0.0)
        || z_max < 0.0
    {
        return Err(HypsoError::CorruptInput {
            message: "Negative value for speed or height above ground level".to_string(),
        });
    }
    if speed.len() != z.len() {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Speed and height arrays disagree: {} vs {}",
                speed.len(),
                z.len()
            ),
        });
    }

    let candidates = z.iter().filter(|&&h| h <= z_max).count();
    if candidates < 2 {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Only {} level(s) at or below {} m; refusing to fit a regression",
                candidates, z_max
            ),
        });
    }

    let (interp, clamped) = regress_log_speeds(speed, z, z_interp, z_max);
    if clamped > 0 {
        debug!(
            clamped = clamped,
            "log_law_interp reset negative speed values to zero"
        );
    }
    Ok((interp, clamped))
}

/// Interpolate one wind column onto the target heights.
///
/// `heights` must be strictly increasing and positive and `targets`
/// non-negative; the orchestrator validates both before dispatching columns.
pub(crate) fn wind_column(
    u: &[f64],
    v: &[f64],
    heights: &[f64],
    targets: &[f64],
    roughness_length: Option<f64>,
    regression_cap: f64,
) -> (Vec<f64>, Vec<f64>, SurfaceLayerStats) {
    debug_assert_eq!(u.len(), heights.len());
    debug_assert_eq!(v.len(), heights.len());
    debug_assert!(heights.len() >= 2);

    let z_min = heights[0];
    let mut u_out = vec![0.0; targets.len()];
    let mut v_out = vec![0.0; targets.len()];
    let mut stats = SurfaceLayerStats::default();

    // Model-resolved regime: plain linear interpolation.
    let mut below = Vec::new();
    for (i, &zt) in targets.iter().enumerate() {
        if zt < z_min {
            below.push((i, zt));
        } else {
            u_out[i] = interp1d(heights, u, zt);
            v_out[i] = interp1d(heights, v, zt);
        }
    }

    if below.is_empty() {
        return (u_out, v_out, stats);
    }

    // Surface-layer regime for speed.
    let speeds: Vec<f64> = u
        .iter()
        .zip(v.iter())
        .map(|(&uc, &vc)| wind_speed(uc, vc))
        .collect();
    let below_z: Vec<f64> = below.iter().map(|&(_, z)| z).collect();

    let surface_speeds = match roughness_length {
        // Diagnose the speed from the roughness length directly.
        Some(z0) if z0 > 0.0 => {
            let denom = (z_min / z0).ln();
            let s0 = speeds[0];
            let mut clamped = 0;
            let speeds: Vec<f64> = below_z
                .iter()
                .map(|&z| {
                    let s = s0 * (z / z0).ln() / denom;
                    if s.is_finite() && s >= 0.0 {
                        s
                    } else {
                        clamped += 1;
                        0.0
                    }
                })
                .collect();
            stats.clamped_speeds += clamped;
            speeds
        }
        // Fall back to the log-linear regression over the low levels. When
        // the second level is already above the cap the fit still needs two
        // points, so the cap is raised to that level.
        _ => {
            let cap = if heights[1] < regression_cap {
                regression_cap
            } else {
                stats.capped_regression = true;
                heights[1]
            };
            let (speeds, clamped) = regress_log_speeds(&speeds, heights, &below_z, cap);
            stats.clamped_speeds += clamped;
            speeds
        }
    };

    // Direction is held constant below the lowest model level.
    let direction = u[0].atan2(v[0]);
    for (&(i, _), &s) in below.iter().zip(surface_speeds.iter()) {
        u_out[i] = s * direction.sin();
        v_out[i] = s * direction.cos();
    }

    (u_out, v_out, stats)
}

/// Interpolate a wind column onto the target heights, validating the column
/// first. Returns (u, v, stats) in target order.
pub fn uv_column_interp(
    u: &[f64],
    v: &[f64],
    heights: &[f64],
    targets: &[f64],
    roughness_length: Option<f64>,
    regression_cap: f64,
) -> Result<(Vec<f64>, Vec<f64>, SurfaceLayerStats)> {
    if u.len() != v.len() || u.len() != heights.len() {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Column lengths disagree: u {}, v {}, heights {}",
                u.len(),
                v.len(),
                heights.len()
            ),
        });
    }
    if heights.len() < 2 {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "At least two vertical levels are required, got {}",
                heights.len()
            ),
        });
    }
    if heights[0] <= 0.0 {
        return Err(HypsoError::CorruptInput {
            message: format!("Lowest model height must be positive, got {}", heights[0]),
        });
    }
    for pair in heights.windows(2) {
        if pair[1] <= pair[0] {
            return Err(HypsoError::CorruptInput {
                message: format!(
                    "Height profile is not strictly increasing: {} after {}",
                    pair[1], pair[0]
                ),
            });
        }
    }
    if targets.iter().any(|&t| !t.is_finite() || t < 0.0) {
        return Err(HypsoError::CorruptInput {
            message: "Target heights must be non-negative".to_string(),
        });
    }
    if !(regression_cap.is_finite() && regression_cap > 0.0) {
        return Err(HypsoError::Config {
            message: format!("Regression cap must be positive, got {}", regression_cap),
        });
    }

    Ok(wind_column(
        u,
        v,
        heights,
        targets,
        roughness_length,
        regression_cap,
    ))
}
