//! In-memory model fields for one interpolation run.
//!
//! This module defines the input field collection read once from the input
//! collaborator, and the fixed-height output collection accumulated by the
//! orchestrator. Arrays are dimensioned (time, level, y, x) for 3D model
//! quantities and (time, y, x) for surface quantities, levels ordered
//! bottom-to-top.

use ndarray::{s, Array2, Array3, Array4};

use crate::config::InterpVar;
use crate::constants::BASE_THETA;
use crate::error::{HypsoError, Result};

/// Grid dimensions of one model output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    /// Number of time steps
    pub nt: usize,
    /// Number of vertical half-levels
    pub nz: usize,
    /// Number of rows
    pub ny: usize,
    /// Number of columns
    pub nx: usize,
}

/// All input fields required for one interpolation pass.
///
/// `pressure` is the full pressure at mass points (perturbation plus base
/// state) and `theta` the full potential temperature (perturbation plus the
/// base offset); both are combined at construction so downstream code never
/// sees the raw perturbation fields.
#[derive(Debug, Clone)]
pub struct ModelFields {
    /// Grid dimensions
    pub dims: GridDims,
    /// Raw time coordinate values, one per time step
    pub times: Vec<f64>,
    /// Units of the time coordinate, if the input file declared them
    pub time_units: Option<String>,
    /// Full pressure at mass points (Pa)
    pub pressure: Array4<f64>,
    /// Surface pressure (Pa)
    pub surface_pressure: Array3<f64>,
    /// Full potential temperature (K)
    pub theta: Array4<f64>,
    /// 2 m temperature (K)
    pub temperature_2m: Array3<f64>,
    /// 2 m potential temperature (K)
    pub theta_2m: Array3<f64>,
    /// Grid-relative u wind at mass points (m s-1)
    pub u: Option<Array4<f64>>,
    /// Grid-relative v wind at mass points (m s-1)
    pub v: Option<Array4<f64>>,
    /// Cosine of the local grid rotation angle
    pub cos_alpha: Option<Array3<f64>>,
    /// Sine of the local grid rotation angle
    pub sin_alpha: Option<Array3<f64>>,
    /// Surface roughness length (m), if the input provides one
    pub roughness_length: Option<Array3<f64>>,
    /// Water vapor mixing ratio (kg kg-1)
    pub qvapor: Option<Array4<f64>>,
    /// 2 m water vapor mixing ratio (kg kg-1)
    pub qvapor_2m: Option<Array3<f64>>,
    /// Cloud fraction at half-levels (0..1)
    pub cloud_fraction: Option<Array4<f64>>,
    /// Longitudes (y, x), passed through to the output file
    pub longitudes: Option<Array2<f64>>,
    /// Latitudes (y, x), passed through to the output file
    pub latitudes: Option<Array2<f64>>,
}

impl ModelFields {
    /// Assemble fields from the raw model output arrays.
    ///
    /// `pressure_pert`/`base_pressure` are summed into the full pressure and
    /// the base offset is added to the perturbation potential temperature.
    /// Skipping that offset is a silent-corruption class of bug, so it is
    /// applied exactly once, here.
    pub fn from_model_output(
        pressure_pert: Array4<f64>,
        base_pressure: Array4<f64>,
        surface_pressure: Array3<f64>,
        theta_pert: Array4<f64>,
        temperature_2m: Array3<f64>,
        theta_2m: Array3<f64>,
    ) -> Result<Self> {
        if pressure_pert.dim() != base_pressure.dim()
            || pressure_pert.dim() != theta_pert.dim()
        {
            return Err(HypsoError::CorruptInput {
                message: format!(
                    "3D field shapes disagree: P {:?}, PB {:?}, T {:?}",
                    pressure_pert.dim(),
                    base_pressure.dim(),
                    theta_pert.dim()
                ),
            });
        }

        let (nt, nz, ny, nx) = pressure_pert.dim();
        let dims = GridDims { nt, nz, ny, nx };

        let pressure = pressure_pert + &base_pressure;
        let theta = theta_pert + BASE_THETA;

        Ok(Self {
            dims,
            times: (0..nt).map(|t| t as f64).collect(),
            time_units: None,
            pressure,
            surface_pressure,
            theta,
            temperature_2m,
            theta_2m,
            u: None,
            v: None,
            cos_alpha: None,
            sin_alpha: None,
            roughness_length: None,
            qvapor: None,
            qvapor_2m: None,
            cloud_fraction: None,
            longitudes: None,
            latitudes: None,
        })
    }

    /// Validate shapes, value sanity, and the prerequisites of the requested
    /// quantities. Called by the orchestrator before any computation.
    pub fn validate(&self, vars: &[InterpVar]) -> Result<()> {
        let GridDims { nt, nz, .. } = self.dims;

        if nz < 2 {
            return Err(HypsoError::CorruptInput {
                message: format!(
                    "At least two vertical levels are required, got {}",
                    nz
                ),
            });
        }

        self.check_3d("pressure", &self.pressure)?;
        self.check_3d("theta", &self.theta)?;
        self.check_2d("surface_pressure", &self.surface_pressure)?;
        self.check_2d("temperature_2m", &self.temperature_2m)?;
        self.check_2d("theta_2m", &self.theta_2m)?;

        if self.times.len() != nt {
            return Err(HypsoError::CorruptInput {
                message: format!(
                    "Time coordinate has {} entries for {} time steps",
                    self.times.len(),
                    nt
                ),
            });
        }

        if self.pressure.iter().any(|&p| p <= 0.0) {
            return Err(HypsoError::CorruptInput {
                message: "Non-positive pressure at a mass point".to_string(),
            });
        }
        if self.surface_pressure.iter().any(|&p| p <= 0.0) {
            return Err(HypsoError::CorruptInput {
                message: "Non-positive surface pressure".to_string(),
            });
        }

        for var in vars {
            match var {
                InterpVar::Wind => {
                    let u = self.require_3d_opt("U", &self.u, "wind")?;
                    let v = self.require_3d_opt("V", &self.v, "wind")?;
                    self.check_3d("u", u)?;
                    self.check_3d("v", v)?;
                    let cos = self.require_2d_opt("COSALPHA", &self.cos_alpha, "wind")?;
                    let sin = self.require_2d_opt("SINALPHA", &self.sin_alpha, "wind")?;
                    self.check_2d("cos_alpha", cos)?;
                    self.check_2d("sin_alpha", sin)?;
                    if let Some(z0) = &self.roughness_length {
                        self.check_2d("roughness_length", z0)?;
                    }
                }
                InterpVar::Dpt => {
                    let qv = self.require_3d_opt("QVAPOR", &self.qvapor, "dew point")?;
                    let q2 = self.require_2d_opt("Q2", &self.qvapor_2m, "dew point")?;
                    self.check_3d("qvapor", qv)?;
                    self.check_2d("qvapor_2m", q2)?;
                    if qv.iter().any(|&q| q < 0.0)
                        || q2.iter().any(|&q| q < 0.0)
                    {
                        return Err(HypsoError::CorruptInput {
                            message: "Negative water vapor mixing ratio".to_string(),
                        });
                    }
                }
                InterpVar::Cld => {
                    let cf =
                        self.require_3d_opt("CLDFRA", &self.cloud_fraction, "cloud fraction")?;
                    self.check_3d("cloud_fraction", cf)?;
                }
                InterpVar::Theta | InterpVar::Pres | InterpVar::Rho => {}
            }
        }

        Ok(())
    }

    fn check_3d(&self, name: &str, array: &Array4<f64>) -> Result<()> {
        let GridDims { nt, nz, ny, nx } = self.dims;
        if array.dim() != (nt, nz, ny, nx) {
            return Err(HypsoError::CorruptInput {
                message: format!(
                    "Field {} has shape {:?}, expected ({}, {}, {}, {})",
                    name,
                    array.dim(),
                    nt,
                    nz,
                    ny,
                    nx
                ),
            });
        }
        if array.iter().any(|v| !v.is_finite()) {
            return Err(HypsoError::CorruptInput {
                message: format!("Field {} contains non-finite values", name),
            });
        }
        Ok(())
    }

    fn check_2d(&self, name: &str, array: &Array3<f64>) -> Result<()> {
        let GridDims { nt, ny, nx, .. } = self.dims;
        if array.dim() != (nt, ny, nx) {
            return Err(HypsoError::CorruptInput {
                message: format!(
                    "Field {} has shape {:?}, expected ({}, {}, {})",
                    name,
                    array.dim(),
                    nt,
                    ny,
                    nx
                ),
            });
        }
        if array.iter().any(|v| !v.is_finite()) {
            return Err(HypsoError::CorruptInput {
                message: format!("Field {} contains non-finite values", name),
            });
        }
        Ok(())
    }

    fn require_3d_opt<'a>(
        &self,
        name: &str,
        field: &'a Option<Array4<f64>>,
        needed_for: &str,
    ) -> Result<&'a Array4<f64>> {
        field.as_ref().ok_or_else(|| HypsoError::MissingVariable {
            name: name.to_string(),
            needed_for: needed_for.to_string(),
        })
    }

    fn require_2d_opt<'a>(
        &self,
        name: &str,
        field: &'a Option<Array3<f64>>,
        needed_for: &str,
    ) -> Result<&'a Array3<f64>> {
        field.as_ref().ok_or_else(|| HypsoError::MissingVariable {
            name: name.to_string(),
            needed_for: needed_for.to_string(),
        })
    }
}

/// Average a wind field staggered along the x axis onto mass points.
pub fn destagger_x(staggered: &Array4<f64>) -> Array4<f64> {
    let left = staggered.slice(s![.., .., .., ..-1]);
    let right = staggered.slice(s![.., .., .., 1..]);
    (&left + &right) / 2.0
}

/// Average a wind field staggered along the y axis onto mass points.
pub fn destagger_y(staggered: &Array4<f64>) -> Array4<f64> {
    let south = staggered.slice(s![.., .., ..-1, ..]);
    let north = staggered.slice(s![.., .., 1.., ..]);
    (&south + &north) / 2.0
}

/// Output of one interpolation pass: fixed-height grids for each requested
/// quantity, plus the eta-height coordinate and warning counters.
#[derive(Debug, Clone)]
pub struct InterpolatedFields {
    /// Target heights above ground (m), the output height coordinate
    pub heights: Vec<f64>,
    /// Height above ground of each model half-level (time, level, y, x)
    pub eta_heights: Array4<f64>,
    /// Earth-relative eastward wind (time, height, y, x)
    pub u: Option<Array4<f64>>,
    /// Earth-relative northward wind (time, height, y, x)
    pub v: Option<Array4<f64>>,
    /// Method used below the lowest model level ("log-law" or "log-linear")
    pub wind_boundary_method: Option<&'static str>,
    /// Potential temperature (time, height, y, x)
    pub theta: Option<Array4<f64>>,
    /// Air pressure (time, height, y, x)
    pub pressure: Option<Array4<f64>>,
    /// Air density (time, height, y, x)
    pub density: Option<Array4<f64>>,
    /// Dew point temperature (time, height, y, x)
    pub dew_point: Option<Array4<f64>>,
    /// One (time, y, x) field per cloud band, in band table order
    pub cloud_bands: Option<Vec<(&'static str, Array3<f64>)>>,
    /// Negative extrapolated wind speeds clamped to zero (no-slip)
    pub clamped_speeds: usize,
    /// Columns where the regression cap had to be raised to the second level
    pub capped_regressions: usize,
}

impl InterpolatedFields {
    /// Create an empty output collection for the given target heights.
    pub fn new(heights: Vec<f64>, eta_heights: Array4<f64>) -> Self {
        Self {
            heights,
            eta_heights,
            u: None,
            v: None,
            wind_boundary_method: None,
            theta: None,
            pressure: None,
            density: None,
            dew_point: None,
            cloud_bands: None,
            clamped_speeds: 0,
            capped_regressions: 0,
        }
    }
}
