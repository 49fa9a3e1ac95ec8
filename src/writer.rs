//! NetCDF output writing.
//!
//! The output file mirrors the input grid with the model's vertical-level
//! dimension replaced by a fixed `height` dimension. Variable names follow
//! the Climate and Forecast convention standard names, and every variable
//! carries its physical unit.

use ndarray::{Array2, Array3, Array4};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::fields::{GridDims, InterpolatedFields, ModelFields};
use crate::interp::cloud::CLOUD_BANDS;

const DIM_TIME: &str = "Time";
const DIM_SIGMA: &str = "atmosphere_sigma_coordinate";
const DIM_HEIGHT: &str = "height";
const DIM_Y: &str = "y";
const DIM_X: &str = "x";

/// Write one interpolation result to a new NetCDF file.
pub fn write_output(
    path: &Path,
    fields: &ModelFields,
    interp: &InterpolatedFields,
) -> Result<()> {
    let mut file = netcdf::create(path)?;
    let GridDims { nt, nz, ny, nx } = fields.dims;
    let nh = interp.heights.len();

    file.add_dimension(DIM_TIME, nt)?;
    file.add_dimension(DIM_SIGMA, nz)?;
    file.add_dimension(DIM_HEIGHT, nh)?;
    file.add_dimension(DIM_Y, ny)?;
    file.add_dimension(DIM_X, nx)?;

    file.add_attribute("title", "Height-interpolated model output")?;
    file.add_attribute("source", concat!("hypso v", env!("CARGO_PKG_VERSION")))?;

    {
        let mut var = file.add_variable::<f64>("time", &[DIM_TIME])?;
        if let Some(units) = &fields.time_units {
            var.put_attribute("units", units.as_str())?;
        }
        var.put_values(&fields.times, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>(DIM_HEIGHT, &[DIM_HEIGHT])?;
        var.put_attribute("units", "m")?;
        var.put_attribute("positive", "up")?;
        var.put_values(&interp.heights, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>(
            "atmosphere_hybrid_height_coordinate",
            &[DIM_TIME, DIM_SIGMA, DIM_Y, DIM_X],
        )?;
        var.put_attribute("units", "m")?;
        var.put_attribute(
            "description",
            "height of each model half-level above ground",
        )?;
        put_values_4d(&mut var, &interp.eta_heights)?;
    }

    if let Some(longitudes) = &fields.longitudes {
        write_coord_2d(&mut file, "longitude", "degrees_east", longitudes)?;
    }
    if let Some(latitudes) = &fields.latitudes {
        write_coord_2d(&mut file, "latitude", "degrees_north", latitudes)?;
    }

    if let (Some(u), Some(v)) = (&interp.u, &interp.v) {
        {
            let mut var =
                file.add_variable::<f64>("eastward_wind", &[DIM_TIME, DIM_HEIGHT, DIM_Y, DIM_X])?;
            var.put_attribute("description", "eastward wind")?;
            var.put_attribute("units", "m s-1")?;
            if let Some(method) = interp.wind_boundary_method {
                var.put_attribute("lower_pbl_interp", method)?;
            }
            put_values_4d(&mut var, u)?;
        }
        {
            let mut var = file
                .add_variable::<f64>("northward_wind", &[DIM_TIME, DIM_HEIGHT, DIM_Y, DIM_X])?;
            var.put_attribute("description", "northward wind")?;
            var.put_attribute("units", "m s-1")?;
            if let Some(method) = interp.wind_boundary_method {
                var.put_attribute("lower_pbl_interp", method)?;
            }
            put_values_4d(&mut var, v)?;
        }
    }

    if let Some(theta) = &interp.theta {
        let mut var = file.add_variable::<f64>(
            "air_potential_temperature",
            &[DIM_TIME, DIM_HEIGHT, DIM_Y, DIM_X],
        )?;
        var.put_attribute("description", "potential temperature")?;
        var.put_attribute("units", "K")?;
        put_values_4d(&mut var, theta)?;
    }

    if let Some(pressure) = &interp.pressure {
        let mut var =
            file.add_variable::<f64>("air_pressure", &[DIM_TIME, DIM_HEIGHT, DIM_Y, DIM_X])?;
        var.put_attribute("description", "air pressure")?;
        var.put_attribute("units", "Pa")?;
        put_values_4d(&mut var, pressure)?;
    }

    if let Some(density) = &interp.density {
        let mut var =
            file.add_variable::<f64>("air_density", &[DIM_TIME, DIM_HEIGHT, DIM_Y, DIM_X])?;
        var.put_attribute("description", "air density")?;
        var.put_attribute("units", "kg m-3")?;
        put_values_4d(&mut var, density)?;
    }

    if let Some(dew_point) = &interp.dew_point {
        let mut var = file.add_variable::<f64>(
            "dew_point_temperature",
            &[DIM_TIME, DIM_HEIGHT, DIM_Y, DIM_X],
        )?;
        var.put_attribute("description", "dew point temperature")?;
        var.put_attribute("units", "K")?;
        put_values_4d(&mut var, dew_point)?;
    }

    if let Some(bands) = &interp.cloud_bands {
        for (name, values) in bands {
            let mut var = file.add_variable::<f64>(
                &format!("cloud_fraction_{}", name),
                &[DIM_TIME, DIM_Y, DIM_X],
            )?;
            var.put_attribute(
                "description",
                format!("cloud fraction, {} band", name).as_str(),
            )?;
            var.put_attribute("units", "1")?;
            if let Some(band) = CLOUD_BANDS.iter().find(|b| b.name == *name) {
                var.put_attribute("cloud_fraction_bottom_m", band.bottom_m)?;
                var.put_attribute("cloud_fraction_top_m", band.top_m)?;
            }
            put_values_3d(&mut var, values)?;
        }
    }

    info!("Wrote NetCDF output: {}", path.display());
    Ok(())
}

fn write_coord_2d(
    file: &mut netcdf::FileMut,
    name: &str,
    units: &str,
    values: &Array2<f64>,
) -> Result<()> {
    let mut var = file.add_variable::<f64>(name, &[DIM_Y, DIM_X])?;
    var.put_attribute("units", units)?;
    let flat: Vec<f64> = values.iter().copied().collect();
    var.put_values(&flat, ..)?;
    Ok(())
}

fn put_values_4d(var: &mut netcdf::VariableMut<'_>, values: &Array4<f64>) -> Result<()> {
    let flat: Vec<f64> = values.iter().copied().collect();
    var.put_values(&flat, ..)?;
    Ok(())
}

fn put_values_3d(var: &mut netcdf::VariableMut<'_>, values: &Array3<f64>) -> Result<()> {
    let flat: Vec<f64> = values.iter().copied().collect();
    var.put_values(&flat, ..)?;
    Ok(())
}
