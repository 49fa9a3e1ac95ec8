//! Height-interpolation orchestrator.
//!
//! One invocation processes one input file: read the model fields, compute
//! the per-column height profiles, interpolate every requested quantity
//! onto the fixed target heights, rotate winds onto earth axes, and write
//! the output file once. A failure anywhere aborts the whole file and
//! leaves no partially written output.
//!
//! Per-column work is dispatched with `Zip::par_for_each` over vertical
//! lanes; columns are independent, so results do not depend on execution
//! order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use ndarray::{Array3, Array4, Axis, Zip};
use tracing::{info, warn};

use crate::config::{Config, InterpVar};
use crate::error::{HypsoError, Result};
use crate::eta_height;
use crate::fields::{GridDims, InterpolatedFields, ModelFields};
use crate::interp::{cloud, scalar, wind};
use crate::logging;
use crate::rotation;

/// Suffix appended to the input file name to form the output file name.
pub const OUTFILE_SUFFIX: &str = "-height-interp";

/// The height-interpolation engine for one run configuration.
///
/// All behavior is selected through the [`Config`] passed at construction;
/// the interpolator itself holds no other state and can process any number
/// of files.
#[derive(Debug, Clone)]
pub struct HeightInterpolator {
    config: Config,
}

impl HeightInterpolator {
    /// Create an interpolator, validating the configuration up front.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this interpolator was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one in-memory interpolation pass over the given fields.
    pub fn interpolate(&self, fields: &ModelFields) -> Result<InterpolatedFields> {
        let cfg = &self.config.interp;
        fields.validate(&cfg.vars)?;

        let start = Instant::now();
        logging::log_operation_start("compute_heights", None);
        let eta_heights = eta_height::calc_eta_heights(
            &fields.pressure,
            &fields.surface_pressure,
            &fields.theta,
            &fields.temperature_2m,
        )?;
        logging::log_operation_end("compute_heights", start, true);

        let GridDims { nt, ny, nx, .. } = fields.dims;
        let nh = cfg.heights.len();
        let targets = cfg.heights.as_slice();

        let mut out = InterpolatedFields::new(cfg.heights.clone(), eta_heights);

        if self.config.wants(InterpVar::Wind) {
            self.interpolate_wind(fields, targets, &mut out)?;
        }

        // Density needs interpolated theta and pressure even when neither
        // was requested on its own.
        let need_theta =
            self.config.wants(InterpVar::Theta) || self.config.wants(InterpVar::Rho);
        let need_pressure =
            self.config.wants(InterpVar::Pres) || self.config.wants(InterpVar::Rho);

        let mut theta_interp = None;
        if need_theta {
            let mut arr = Array4::<f64>::zeros((nt, nh, ny, nx));
            Zip::from(fields.theta.lanes(Axis(1)))
                .and(out.eta_heights.lanes(Axis(1)))
                .and(&fields.theta_2m)
                .and(arr.lanes_mut(Axis(1)))
                .par_for_each(|theta_col, h_col, &theta_2m, mut lane| {
                    let vals = scalar::theta_column(
                        &theta_col.to_vec(),
                        &h_col.to_vec(),
                        theta_2m,
                        targets,
                    );
                    for (dst, val) in lane.iter_mut().zip(vals) {
                        *dst = val;
                    }
                });
            theta_interp = Some(arr);
        }

        let mut pressure_interp = None;
        if need_pressure {
            let mut arr = Array4::<f64>::zeros((nt, nh, ny, nx));
            Zip::from(fields.pressure.lanes(Axis(1)))
                .and(out.eta_heights.lanes(Axis(1)))
                .and(&fields.surface_pressure)
                .and(arr.lanes_mut(Axis(1)))
                .par_for_each(|p_col, h_col, &p_sfc, mut lane| {
                    let vals = scalar::pressure_column(
                        &p_col.to_vec(),
                        &h_col.to_vec(),
                        p_sfc,
                        targets,
                    );
                    for (dst, val) in lane.iter_mut().zip(vals) {
                        *dst = val;
                    }
                });
            pressure_interp = Some(arr);
        }

        if self.config.wants(InterpVar::Rho) {
            if let (Some(theta), Some(pressure)) = (&theta_interp, &pressure_interp) {
                let mut rho = Array4::<f64>::zeros((nt, nh, ny, nx));
                Zip::from(&mut rho)
                    .and(theta)
                    .and(pressure)
                    .par_for_each(|dst, &th, &p| {
                        *dst = scalar::air_density(th, p);
                    });
                out.density = Some(rho);
            }
        }

        if self.config.wants(InterpVar::Theta) {
            out.theta = theta_interp;
        }
        if self.config.wants(InterpVar::Pres) {
            out.pressure = pressure_interp;
        }

        if self.config.wants(InterpVar::Dpt) {
            let qvapor = require(&fields.qvapor, "QVAPOR", "dew point")?;
            let qvapor_2m = require(&fields.qvapor_2m, "Q2", "dew point")?;
            let mut arr = Array4::<f64>::zeros((nt, nh, ny, nx));
            Zip::from(qvapor.lanes(Axis(1)))
                .and(fields.pressure.lanes(Axis(1)))
                .and(out.eta_heights.lanes(Axis(1)))
                .and(qvapor_2m)
                .and(&fields.surface_pressure)
                .and(arr.lanes_mut(Axis(1)))
                .par_for_each(|qv_col, p_col, h_col, &q2, &p_sfc, mut lane| {
                    let vals = scalar::dew_point_column(
                        &qv_col.to_vec(),
                        &p_col.to_vec(),
                        &h_col.to_vec(),
                        q2,
                        p_sfc,
                        targets,
                    );
                    for (dst, val) in lane.iter_mut().zip(vals) {
                        *dst = val;
                    }
                });
            out.dew_point = Some(arr);
        }

        if self.config.wants(InterpVar::Cld) {
            let cloud_fraction = require(&fields.cloud_fraction, "CLDFRA", "cloud fraction")?;
            let mut fog = Array3::<f64>::zeros((nt, ny, nx));
            let mut low = Array3::<f64>::zeros((nt, ny, nx));
            let mut mid = Array3::<f64>::zeros((nt, ny, nx));
            let mut high = Array3::<f64>::zeros((nt, ny, nx));
            Zip::from(cloud_fraction.lanes(Axis(1)))
                .and(out.eta_heights.lanes(Axis(1)))
                .and(&mut fog)
                .and(&mut low)
                .and(&mut mid)
                .and(&mut high)
                .par_for_each(|cf_col, h_col, fog, low, mid, high| {
                    let bands =
                        cloud::band_fractions(&cf_col.to_vec(), &h_col.to_vec());
                    *fog = bands[0];
                    *low = bands[1];
                    *mid = bands[2];
                    *high = bands[3];
                });
            out.cloud_bands = Some(vec![
                (cloud::CLOUD_BANDS[0].name, fog),
                (cloud::CLOUD_BANDS[1].name, low),
                (cloud::CLOUD_BANDS[2].name, mid),
                (cloud::CLOUD_BANDS[3].name, high),
            ]);
        }

        Ok(out)
    }

    /// Interpolate wind columns and rotate them onto earth axes.
    fn interpolate_wind(
        &self,
        fields: &ModelFields,
        targets: &[f64],
        out: &mut InterpolatedFields,
    ) -> Result<()> {
        let cfg = &self.config.interp;
        let GridDims { nt, ny, nx, .. } = fields.dims;
        let nh = targets.len();

        let u = require(&fields.u, "U", "wind")?;
        let v = require(&fields.v, "V", "wind")?;
        let cos_alpha = require(&fields.cos_alpha, "COSALPHA", "wind")?;
        let sin_alpha = require(&fields.sin_alpha, "SINALPHA", "wind")?;

        let mut u_grid = Array4::<f64>::zeros((nt, nh, ny, nx));
        let mut v_grid = Array4::<f64>::zeros((nt, nh, ny, nx));
        let clamped = AtomicUsize::new(0);
        let capped = AtomicUsize::new(0);

        match &fields.roughness_length {
            Some(roughness) => {
                Zip::from(u.lanes(Axis(1)))
                    .and(v.lanes(Axis(1)))
                    .and(out.eta_heights.lanes(Axis(1)))
                    .and(u_grid.lanes_mut(Axis(1)))
                    .and(v_grid.lanes_mut(Axis(1)))
                    .and(roughness)
                    .par_for_each(|u_col, v_col, h_col, mut u_lane, mut v_lane, &z0| {
                        let (ui, vi, stats) = wind::wind_column(
                            &u_col.to_vec(),
                            &v_col.to_vec(),
                            &h_col.to_vec(),
                            targets,
                            Some(z0),
                            cfg.regression_cap,
                        );
                        for (dst, val) in u_lane.iter_mut().zip(ui) {
                            *dst = val;
                        }
                        for (dst, val) in v_lane.iter_mut().zip(vi) {
                            *dst = val;
                        }
                        record_stats(&stats, &clamped, &capped);
                    });
                out.wind_boundary_method = Some("log-law");
            }
            None => {
                Zip::from(u.lanes(Axis(1)))
                    .and(v.lanes(Axis(1)))
                    .and(out.eta_heights.lanes(Axis(1)))
                    .and(u_grid.lanes_mut(Axis(1)))
                    .and(v_grid.lanes_mut(Axis(1)))
                    .par_for_each(|u_col, v_col, h_col, mut u_lane, mut v_lane| {
                        let (ui, vi, stats) = wind::wind_column(
                            &u_col.to_vec(),
                            &v_col.to_vec(),
                            &h_col.to_vec(),
                            targets,
                            None,
                            cfg.regression_cap,
                        );
                        for (dst, val) in u_lane.iter_mut().zip(ui) {
                            *dst = val;
                        }
                        for (dst, val) in v_lane.iter_mut().zip(vi) {
                            *dst = val;
                        }
                        record_stats(&stats, &clamped, &capped);
                    });
                out.wind_boundary_method = Some("log-linear");
            }
        }

        out.clamped_speeds = clamped.into_inner();
        out.capped_regressions = capped.into_inner();
        if out.clamped_speeds > 0 {
            info!(
                clamped = out.clamped_speeds,
                "Negative extrapolated wind speeds were reset to zero"
            );
        }
        if out.capped_regressions > 0 {
            warn!(
                columns = out.capped_regressions,
                "Surface-layer regression had to include a level above the cap"
            );
        }

        let (u_earth, v_earth) = rotation::rotate_to_earth(&u_grid, &v_grid, cos_alpha, sin_alpha);
        out.u = Some(u_earth);
        out.v = Some(v_earth);
        Ok(())
    }

    /// Interpolate one file on disk, writing the sibling output file.
    ///
    /// The output is written to a temporary path and renamed into place on
    /// success, so a failed run never leaves a partial file behind.
    #[cfg(feature = "netcdf")]
    pub fn interp_file(&self, input: &std::path::Path) -> Result<std::path::PathBuf> {
        use crate::{data_loader, writer};

        let start = Instant::now();
        logging::log_operation_start("interp_file", Some(&input.display().to_string()));

        let fields = data_loader::load_model_file(input, &self.config)?;
        let result = self.interpolate(&fields)?;

        let out_path = output_path(input);
        let tmp_path = out_path.with_extension("nc.tmp");
        if let Err(e) = writer::write_output(&tmp_path, &fields, &result) {
            let _ = std::fs::remove_file(&tmp_path);
            logging::log_operation_end("interp_file", start, false);
            return Err(e);
        }
        std::fs::rename(&tmp_path, &out_path)?;

        let vars = self
            .config
            .interp
            .vars
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let GridDims { nt, ny, nx, .. } = fields.dims;
        logging::log_interp_stats(
            &input.display().to_string(),
            &vars,
            result.heights.len(),
            nt * ny * nx,
            result.clamped_speeds,
            result.capped_regressions,
        );
        logging::log_operation_end("interp_file", start, true);
        Ok(out_path)
    }
}

fn record_stats(
    stats: &wind::SurfaceLayerStats,
    clamped: &AtomicUsize,
    capped: &AtomicUsize,
) {
    if stats.clamped_speeds > 0 {
        clamped.fetch_add(stats.clamped_speeds, Ordering::Relaxed);
    }
    if stats.capped_regression {
        capped.fetch_add(1, Ordering::Relaxed);
    }
}

fn require<'a, T>(field: &'a Option<T>, name: &str, needed_for: &str) -> Result<&'a T> {
    field.as_ref().ok_or_else(|| HypsoError::MissingVariable {
        name: name.to_string(),
        needed_for: needed_for.to_string(),
    })
}

/// Derive the output path from the input path.
#[cfg(feature = "netcdf")]
fn output_path(input: &std::path::Path) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}{}.nc", stem, OUTFILE_SUFFIX))
}
