//! NetCDF input loading.
//!
//! This module reads a terrain-following model output file (WRF naming
//! conventions) into [`ModelFields`]. Wind components arrive on staggered
//! flux points and are averaged onto mass points here; the perturbation
//! pressure and potential temperature are combined with their base states
//! at construction.

use ndarray::{Array2, Array3, Array4, Axis};
use std::path::Path;
use tracing::{debug, info};

use crate::config::{Config, InterpVar};
use crate::error::{HypsoError, Result};
use crate::fields::{destagger_x, destagger_y, ModelFields};

/// Load a model output file into memory.
///
/// Only the variables needed for the requested quantities are read; a
/// missing prerequisite is a fatal error before any computation starts.
pub fn load_model_file(path: &Path, config: &Config) -> Result<ModelFields> {
    if !path.exists() {
        return Err(HypsoError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let file = netcdf::open(path)?;
    info!("Opened NetCDF file: {}", path.display());
    debug!("File has {} variables", file.variables().count());

    // Fields every run needs for the height profiles
    let pressure_pert = get_array4(&file, "P", "eta heights")?;
    let base_pressure = get_array4(&file, "PB", "eta heights")?;
    let surface_pressure = get_array3(&file, "PSFC", "eta heights")?;
    let theta_pert = get_array4(&file, "T", "eta heights")?;
    let temperature_2m = get_array3(&file, "T2", "eta heights")?;
    let theta_2m = get_array3(&file, "TH2", "surface boundary values")?;

    let mut fields = ModelFields::from_model_output(
        pressure_pert,
        base_pressure,
        surface_pressure,
        theta_pert,
        temperature_2m,
        theta_2m,
    )?;

    if let Some(var) = file.variable("XTIME") {
        fields.times = var.get_values::<f64, _>(..)?;
        if let Some(attr) = var.attribute("units") {
            if let Ok(netcdf::AttributeValue::Str(units)) = attr.value() {
                fields.time_units = Some(units);
            }
        }
    } else {
        debug!("No XTIME variable; using time step indices");
    }

    if config.wants(InterpVar::Wind) {
        let u_staggered = get_array4(&file, "U", "wind")?;
        let v_staggered = get_array4(&file, "V", "wind")?;
        fields.u = Some(destagger_x(&u_staggered));
        fields.v = Some(destagger_y(&v_staggered));
        fields.cos_alpha = Some(get_array3(&file, "COSALPHA", "wind")?);
        fields.sin_alpha = Some(get_array3(&file, "SINALPHA", "wind")?);

        // The roughness length selects the surface-layer method
        fields.roughness_length = try_array3(&file, "ZNT")?;
        match fields.roughness_length {
            Some(_) => info!("ZNT present; using the log-law below the lowest model level"),
            None => info!("No ZNT; using log-linear regression below the lowest model level"),
        }
    }

    if config.wants(InterpVar::Dpt) {
        fields.qvapor = Some(get_array4(&file, "QVAPOR", "dew point")?);
        fields.qvapor_2m = Some(get_array3(&file, "Q2", "dew point")?);
    }

    if config.wants(InterpVar::Cld) {
        fields.cloud_fraction = Some(get_array4(&file, "CLDFRA", "cloud fraction")?);
    }

    // Coordinates are passed through to the output for mapping
    fields.longitudes = try_coord_2d(&file, "XLONG")?;
    fields.latitudes = try_coord_2d(&file, "XLAT")?;

    Ok(fields)
}

/// Read a 4D (time, level, y, x) variable.
fn get_array4(file: &netcdf::File, name: &str, needed_for: &str) -> Result<Array4<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| HypsoError::MissingVariable {
            name: name.to_string(),
            needed_for: needed_for.to_string(),
        })?;
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    if shape.len() != 4 {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Variable {} has {} dimensions, expected 4",
                name,
                shape.len()
            ),
        });
    }
    let values = var.get_values::<f64, _>(..)?;
    let array = Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), values)?;
    Ok(array)
}

/// Read a 3D (time, y, x) variable.
fn get_array3(file: &netcdf::File, name: &str, needed_for: &str) -> Result<Array3<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| HypsoError::MissingVariable {
            name: name.to_string(),
            needed_for: needed_for.to_string(),
        })?;
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    if shape.len() != 3 {
        return Err(HypsoError::CorruptInput {
            message: format!(
                "Variable {} has {} dimensions, expected 3",
                name,
                shape.len()
            ),
        });
    }
    let values = var.get_values::<f64, _>(..)?;
    let array = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values)?;
    Ok(array)
}

/// Read an optional 3D (time, y, x) variable.
fn try_array3(file: &netcdf::File, name: &str) -> Result<Option<Array3<f64>>> {
    if file.variable(name).is_none() {
        return Ok(None);
    }
    get_array3(file, name, "optional field").map(Some)
}

/// Read an optional (time, y, x) coordinate variable, keeping the first
/// time step. Coordinates do not move between time steps.
fn try_coord_2d(file: &netcdf::File, name: &str) -> Result<Option<Array2<f64>>> {
    match try_array3(file, name)? {
        Some(coord) => Ok(Some(coord.index_axis(Axis(0), 0).to_owned())),
        None => Ok(None),
    }
}
