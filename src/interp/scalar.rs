//! Scalar column interpolation with per-quantity ground boundaries.
//!
//! Scalars use plain linear interpolation in height once the column has
//! been augmented with its ground boundary: potential temperature anchors
//! the 2 m value at 2 m, pressure anchors the surface pressure at 0 m, and
//! dew point is derived from water vapor and pressure with the 2 m humidity
//! anchored at 0 m. No log-law regime applies to scalars.

use super::{interp1d, with_ground_anchor};
use crate::constants::{DPT_A, DPT_B, DPT_EPSILON, KAPPA, R_CONST, REF_PRES};

/// Potential temperature at the target heights. Heights below the 2 m
/// anchor take the 2 m value.
pub fn theta_column(
    theta: &[f64],
    heights: &[f64],
    theta_2m: f64,
    targets: &[f64],
) -> Vec<f64> {
    let (xs, ys) = with_ground_anchor(2.0, theta_2m, heights, theta);
    targets.iter().map(|&z| interp1d(&xs, &ys, z)).collect()
}

/// Air pressure at the target heights, anchored at the surface pressure.
pub fn pressure_column(
    pressure: &[f64],
    heights: &[f64],
    surface_pressure: f64,
    targets: &[f64],
) -> Vec<f64> {
    let (xs, ys) = with_ground_anchor(0.0, surface_pressure, heights, pressure);
    targets.iter().map(|&z| interp1d(&xs, &ys, z)).collect()
}

/// Dew point temperature (K) from water vapor mixing ratio (kg kg-1) and
/// pressure (Pa).
pub fn dew_point(qvapor: f64, pressure: f64) -> f64 {
    DPT_B / (DPT_A * DPT_EPSILON / (qvapor * pressure)).ln()
}

/// Dew point at the target heights, derived level by level and anchored at
/// 0 m with the 2 m humidity and surface pressure.
pub fn dew_point_column(
    qvapor: &[f64],
    pressure: &[f64],
    heights: &[f64],
    qvapor_2m: f64,
    surface_pressure: f64,
    targets: &[f64],
) -> Vec<f64> {
    debug_assert_eq!(qvapor.len(), pressure.len());
    debug_assert_eq!(qvapor.len(), heights.len());

    let td: Vec<f64> = qvapor
        .iter()
        .zip(pressure.iter())
        .map(|(&qv, &p)| dew_point(qv, p))
        .collect();
    let (xs, ys) = with_ground_anchor(
        0.0,
        dew_point(qvapor_2m, surface_pressure),
        heights,
        &td,
    );
    targets.iter().map(|&z| interp1d(&xs, &ys, z)).collect()
}

/// Air density from interpolated potential temperature and pressure via the
/// equation of state, converting to actual temperature first.
pub fn air_density(theta: f64, pressure: f64) -> f64 {
    let temperature = theta * (pressure / REF_PRES).powf(KAPPA);
    pressure / (R_CONST * temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theta_column_uses_2m_boundary() {
        let theta = [302.0, 305.0];
        let heights = [100.0, 400.0];
        let out = theta_column(&theta, &heights, 300.0, &[0.0, 2.0, 51.0, 100.0]);
        // Below the anchor the 2 m value applies
        assert_eq!(out[0], 300.0);
        assert_eq!(out[1], 300.0);
        // Halfway between 2 m (300 K) and 100 m (302 K)
        assert!((out[2] - 301.0).abs() < 1e-12);
        assert_eq!(out[3], 302.0);
    }

    #[test]
    fn test_pressure_column_anchored_at_surface() {
        let pressure = [95_000.0, 85_000.0];
        let heights = [500.0, 1500.0];
        let out = pressure_column(&pressure, &heights, 100_000.0, &[0.0, 250.0, 1000.0]);
        assert_eq!(out[0], 100_000.0);
        assert!((out[1] - 97_500.0).abs() < 1e-9);
        assert!((out[2] - 90_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_dew_point_known_value() {
        // qv = 10 g/kg at 1000 hPa is a dew point close to 287 K
        let td = dew_point(0.01, 100_000.0);
        assert!((td - 287.2).abs() < 0.5, "td = {}", td);
    }

    #[test]
    fn test_dew_point_increases_with_moisture() {
        let dry = dew_point(0.002, 100_000.0);
        let moist = dew_point(0.015, 100_000.0);
        assert!(moist > dry);
    }

    #[test]
    fn test_dew_point_column_round_trips_native_heights() {
        let qv = [0.010, 0.008, 0.004];
        let p = [95_000.0, 85_000.0, 70_000.0];
        let heights = [400.0, 1300.0, 3000.0];
        let out = dew_point_column(&qv, &p, &heights, 0.011, 100_000.0, &heights);
        for (got, (&q, &pp)) in out.iter().zip(qv.iter().zip(p.iter())) {
            assert!((got - dew_point(q, pp)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_air_density_at_reference() {
        // At the reference pressure theta equals temperature
        let rho = air_density(300.0, REF_PRES);
        let expected = REF_PRES / (R_CONST * 300.0);
        assert!((rho - expected).abs() < 1e-12);
        assert!((rho - 1.161).abs() < 0.01, "rho = {}", rho);
    }

    #[test]
    fn test_air_density_uses_actual_temperature() {
        // At lower pressure the actual temperature is below theta, so the
        // density must exceed the naive p / (R * theta).
        let rho = air_density(300.0, 70_000.0);
        let naive = 70_000.0 / (R_CONST * 300.0);
        assert!(rho > naive);
    }
}
