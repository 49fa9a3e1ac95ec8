//! Height above ground of the model's terrain-following levels.
//!
//! The model's vertical coordinate tracks surface pressure, so the physical
//! height of every half-level differs per column and per time step. This
//! module derives those heights from the hypsometric equation: the thickness
//! of a layer is R/g times its mean temperature times the log of its
//! pressure ratio. Layer thicknesses are prefix-summed from the ground up.
//!
//! Columns are independent, so everything here is expressed as whole-array
//! operations broadcast over (time, y, x).

use ndarray::{s, Array, Array3, Array4, ArrayView, Axis, Dimension, Zip};

use crate::constants::{
    BASE_LAPSE_RATE, BASE_SEA_LEVEL_PRESSURE, BASE_SEA_LEVEL_TEMPERATURE, G_CONST, KAPPA,
    R_CONST, REF_PRES, TOP_PRESSURE,
};
use crate::error::{HypsoError, Result};

/// Convert potential temperature to actual temperature via the Poisson
/// relation and average across a layer, elementwise over any grid shape.
pub fn mean_layer_temperature<D: Dimension>(
    theta_lower: ArrayView<'_, f64, D>,
    pressure_lower: ArrayView<'_, f64, D>,
    theta_upper: ArrayView<'_, f64, D>,
    pressure_upper: ArrayView<'_, f64, D>,
) -> Array<f64, D> {
    let mut mean = Array::zeros(theta_lower.raw_dim());
    Zip::from(&mut mean)
        .and(&theta_lower)
        .and(&pressure_lower)
        .and(&theta_upper)
        .and(&pressure_upper)
        .for_each(|out, &th_lo, &p_lo, &th_up, &p_up| {
            let t_lo = th_lo / (REF_PRES / p_lo).powf(KAPPA);
            let t_up = th_up / (REF_PRES / p_up).powf(KAPPA);
            *out = (t_lo + t_up) / 2.0;
        });
    mean
}

/// Calculate the height above ground of every model half-level.
///
/// The lowest layer spans surface pressure to the first half-level using the
/// mean of the 2 m temperature and the first-level temperature; every layer
/// above spans consecutive half-levels. The returned field is
/// (time, level, y, x) with strictly increasing, positive heights per column.
///
/// A non-positive pressure or a non-monotonic profile is a fatal input-data
/// error.
pub fn calc_eta_heights(
    pressure: &Array4<f64>,
    surface_pressure: &Array3<f64>,
    theta: &Array4<f64>,
    temperature_2m: &Array3<f64>,
) -> Result<Array4<f64>> {
    let (nt, nz, ny, nx) = pressure.dim();
    if nz < 2 {
        return Err(HypsoError::CorruptInput {
            message: format!("At least two vertical levels are required, got {}", nz),
        });
    }
    if pressure.iter().any(|&p| p <= 0.0) || surface_pressure.iter().any(|&p| p <= 0.0) {
        return Err(HypsoError::CorruptInput {
            message: "Non-positive pressure; the hypsometric log is undefined".to_string(),
        });
    }

    let mut heights = Array4::<f64>::zeros((nt, nz, ny, nx));

    // Bottom layer: surface up to the first half-level. The 2 m temperature
    // enters the Poisson relation against surface pressure.
    let pressure_bottom = pressure.index_axis(Axis(1), 0);
    let theta_bottom = theta.index_axis(Axis(1), 0);
    let t_bottom = mean_layer_temperature(
        temperature_2m.view(),
        surface_pressure.view(),
        theta_bottom,
        pressure_bottom.view(),
    );
    Zip::from(heights.index_axis_mut(Axis(1), 0))
        .and(&t_bottom)
        .and(surface_pressure)
        .and(pressure_bottom)
        .for_each(|h, &t, &p_sfc, &p_lvl| {
            *h = R_CONST / G_CONST * t * (p_sfc / p_lvl).ln();
        });

    // Interior layers: consecutive half-levels.
    let pressure_below = pressure.slice(s![.., ..-1, .., ..]);
    let pressure_above = pressure.slice(s![.., 1.., .., ..]);
    let t_mass = mean_layer_temperature(
        theta.slice(s![.., ..-1, .., ..]),
        pressure_below.view(),
        theta.slice(s![.., 1.., .., ..]),
        pressure_above.view(),
    );
    Zip::from(heights.slice_mut(s![.., 1.., .., ..]))
        .and(&t_mass)
        .and(&pressure_below)
        .and(&pressure_above)
        .for_each(|h, &t, &p_lo, &p_up| {
            *h = R_CONST / G_CONST * t * (p_lo / p_up).ln();
        });

    // Each entry currently holds a layer thickness; they must all be
    // positive or the height profile cannot be strictly increasing.
    let bad = heights
        .iter()
        .filter(|v| !v.is_finite() || **v <= 0.0)
        .count();
    if bad > 0 {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "{} model layer(s) have non-positive thickness; \
                 height profile is not strictly increasing",
                bad
            ),
        });
    }

    // Prefix-sum thicknesses from the ground to get height above ground.
    heights.accumulate_axis_inplace(Axis(1), |&prev, cur| *cur += prev);

    Ok(heights)
}

/// Height of an eta level in the base-state atmosphere.
///
/// Uses the run-time base state written by the model (`P00`, `T00`, `TLP`,
/// `P_TOP`). Returns 0 exactly at eta = 1 (the surface reference) and grows
/// as eta decreases toward the model top.
pub fn calculate_height(eta_level: f64, terrain_height: f64) -> Result<f64> {
    calculate_height_with_base(
        eta_level,
        terrain_height,
        BASE_SEA_LEVEL_PRESSURE,
        BASE_SEA_LEVEL_TEMPERATURE,
        BASE_LAPSE_RATE,
        TOP_PRESSURE,
    )
}

/// [`calculate_height`] with an explicit base state.
pub fn calculate_height_with_base(
    eta_level: f64,
    terrain_height: f64,
    base_sea_level_pressure: f64,
    base_sea_level_temperature: f64,
    base_lapse_rate: f64,
    top_pressure: f64,
) -> Result<f64> {
    if !(0.0..=1.0).contains(&eta_level) {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Eta value is not between zero and one: {}",
                eta_level
            ),
        });
    }

    // Base-state pressure at this eta level, from the definition of the
    // terrain-following coordinate.
    let column_pressure = base_sea_level_pressure - top_pressure;
    let p0 = eta_level * column_pressure + top_pressure;

    let term = (p0 / base_sea_level_pressure).ln();
    let height = -R_CONST / G_CONST
        * (base_sea_level_temperature * term + (base_lapse_rate / 2.0) * term.powi(2))
        - terrain_height;

    if height < 0.0 {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Negative height above ground for an eta level: {}",
                height
            ),
        });
    }

    Ok(height)
}
