//! Shared fixtures for the integration tests.
//!
//! Builds small synthetic model grids with horizontally uniform columns so
//! expected values can be computed by hand.

#![allow(dead_code)]

use ndarray::{s, Array3, Array4};

use hypso::{Config, InterpVar, ModelFields};

/// Pressure at each half-level (Pa), bottom to top.
pub const LEVEL_PRESSURES: [f64; 4] = [95_000.0, 85_000.0, 70_000.0, 50_000.0];

/// Surface pressure (Pa).
pub const SURFACE_PRESSURE: f64 = 100_000.0;

/// Build a horizontally uniform grid: every column has the same pressure
/// profile and a 300 K potential temperature throughout.
pub fn uniform_fields(nt: usize, ny: usize, nx: usize) -> ModelFields {
    let nz = LEVEL_PRESSURES.len();
    let pressure_pert = Array4::zeros((nt, nz, ny, nx));
    let mut base_pressure = Array4::zeros((nt, nz, ny, nx));
    for (k, &p) in LEVEL_PRESSURES.iter().enumerate() {
        base_pressure.slice_mut(s![.., k, .., ..]).fill(p);
    }
    let theta_pert = Array4::zeros((nt, nz, ny, nx));
    let surface_pressure = Array3::from_elem((nt, ny, nx), SURFACE_PRESSURE);
    let temperature_2m = Array3::from_elem((nt, ny, nx), 300.0);
    let theta_2m = Array3::from_elem((nt, ny, nx), 300.0);

    ModelFields::from_model_output(
        pressure_pert,
        base_pressure,
        surface_pressure,
        theta_pert,
        temperature_2m,
        theta_2m,
    )
    .expect("synthetic fields must build")
}

/// Attach wind fields with the given per-level u/v values, identical in
/// every column, with a zero rotation angle.
pub fn with_wind(mut fields: ModelFields, u_levels: &[f64], v_levels: &[f64]) -> ModelFields {
    let (nt, nz, ny, nx) = fields.pressure.dim();
    assert_eq!(u_levels.len(), nz);

    let mut u = Array4::zeros((nt, nz, ny, nx));
    let mut v = Array4::zeros((nt, nz, ny, nx));
    for k in 0..nz {
        u.slice_mut(s![.., k, .., ..]).fill(u_levels[k]);
        v.slice_mut(s![.., k, .., ..]).fill(v_levels[k]);
    }
    fields.u = Some(u);
    fields.v = Some(v);
    fields.cos_alpha = Some(Array3::from_elem((nt, ny, nx), 1.0));
    fields.sin_alpha = Some(Array3::from_elem((nt, ny, nx), 0.0));
    fields
}

/// Set a rotation angle (radians) in every column.
pub fn with_rotation(mut fields: ModelFields, angle: f64) -> ModelFields {
    let (nt, _, ny, nx) = fields.pressure.dim();
    fields.cos_alpha = Some(Array3::from_elem((nt, ny, nx), angle.cos()));
    fields.sin_alpha = Some(Array3::from_elem((nt, ny, nx), angle.sin()));
    fields
}

/// Attach a constant cloud-fraction profile.
pub fn with_cloud(mut fields: ModelFields, fraction: f64) -> ModelFields {
    let (nt, nz, ny, nx) = fields.pressure.dim();
    fields.cloud_fraction = Some(Array4::from_elem((nt, nz, ny, nx), fraction));
    fields
}

/// Attach humidity fields decreasing with height.
pub fn with_moisture(mut fields: ModelFields) -> ModelFields {
    let (nt, nz, ny, nx) = fields.pressure.dim();
    let mut qvapor = Array4::zeros((nt, nz, ny, nx));
    for (k, &qv) in [0.010, 0.008, 0.005, 0.002].iter().enumerate().take(nz) {
        qvapor.slice_mut(s![.., k, .., ..]).fill(qv);
    }
    fields.qvapor = Some(qvapor);
    fields.qvapor_2m = Some(Array3::from_elem((nt, ny, nx), 0.011));
    fields
}

/// A config requesting the given quantities at the given heights.
pub fn config_for(heights: &[f64], vars: &[InterpVar], allow_above_ceiling: bool) -> Config {
    let mut config = Config::default();
    config.interp.heights = heights.to_vec();
    config.interp.vars = vars.to_vec();
    config.interp.allow_above_ceiling = allow_above_ceiling;
    config
}
