//! Physical constants for WRF-style atmospheric interpolation.
//!
//! Values are taken verbatim from the reference WRFV3.2 constants
//! (`windb2/model/wrf/constants.py`) and the dew-point constants described
//! in the specification (§2 Physical Constants, §9 Dew point formula).

/// Gas constant for dry air (Pa/kg-K).
pub const R_CONST: f64 = 287.04;

/// Gravitational acceleration (m/s^2).
pub const G_CONST: f64 = 9.80665;

/// Reference pressure (Pa) — 1E5 Pa (1000 hPa) per WRF Tech Description.
pub const REF_PRES: f64 = 100_000.0;

/// Kappa constant for potential temperature (R_d/C_p).
pub const KAPPA: f64 = 0.28571;

/// Potential-temperature base offset (K) applied to the model's perturbation
/// potential temperature field.
pub const BASE_THETA: f64 = 300.0;

/// Base-state sea-level pressure (Pa) — WRF `P00` variable.
pub const BASE_SEA_LEVEL_PRESSURE: f64 = 1.0e5;

/// Base-state sea-level temperature (K) — WRF `T00` variable.
pub const BASE_SEA_LEVEL_TEMPERATURE: f64 = 290.0;

/// Base-state lapse rate d(T)/d(ln p) — WRF `TLP` variable.
pub const BASE_LAPSE_RATE: f64 = 50.0;

/// Model top pressure (Pa) — WRF `P_TOP` variable.
pub const TOP_PRESSURE: f64 = 5.0e3;

/// Dew-point formula constant A (Pa): Td = B / ln(A·E / (qv·p)).
pub const DPT_A: f64 = 2.53e11;

/// Dew-point formula constant B (K): Td = B / ln(A·E / (qv·p)).
pub const DPT_B: f64 = 5.42e3;

/// Dew-point formula constant E (ratio of molar masses, water/dry air).
pub const DPT_EPSILON: f64 = 0.622;
