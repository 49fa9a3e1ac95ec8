//! Cloud-fraction banding.
//!
//! The native cloud-fraction profile is resampled onto a fine height grid,
//! anchored at zero fraction at the ground, then averaged over each named
//! band. This gives a smooth estimate that does not depend on how many
//! model levels happen to fall inside a band.
//!
//! Band ranges follow the mid-latitude low/mid/high cloud heights from
//! Galvin, An Introduction to the Meteorology and Climate of the Tropics,
//! 2016. Fog is arbitrarily defined as the lowest 30 m.

use super::{interp1d, with_ground_anchor};

/// One named height band, half-open: bottom <= z < top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudBand {
    /// Band name, used as a variable-name suffix in the output file
    pub name: &'static str,
    /// Bottom of the band (m, inclusive)
    pub bottom_m: f64,
    /// Top of the band (m, exclusive)
    pub top_m: f64,
}

/// The band table, ordered bottom-up. Bands may overlap.
pub const CLOUD_BANDS: [CloudBand; 4] = [
    CloudBand {
        name: "fog",
        bottom_m: 0.0,
        top_m: 30.0,
    },
    CloudBand {
        name: "low",
        bottom_m: 0.0,
        top_m: 2_000.0,
    },
    CloudBand {
        name: "mid",
        bottom_m: 2_000.0,
        top_m: 7_000.0,
    },
    CloudBand {
        name: "high",
        bottom_m: 5_000.0,
        top_m: 13_000.0,
    },
];

/// Spacing of the fine resampling grid (m). Must resolve the narrowest
/// band, which is the 30 m fog band.
pub const SAMPLE_STEP_M: f64 = 10.0;

/// Average cloud fraction per band for one column.
///
/// Returns one value per entry of [`CLOUD_BANDS`], in table order.
pub fn band_fractions(cloud_fraction: &[f64], heights: &[f64]) -> [f64; CLOUD_BANDS.len()] {
    debug_assert_eq!(cloud_fraction.len(), heights.len());

    let (xs, ys) = with_ground_anchor(0.0, 0.0, heights, cloud_fraction);

    let top = CLOUD_BANDS
        .iter()
        .fold(0.0_f64, |acc, band| acc.max(band.top_m));
    let n_samples = (top / SAMPLE_STEP_M) as usize;

    let mut sums = [0.0; CLOUD_BANDS.len()];
    let mut counts = [0usize; CLOUD_BANDS.len()];
    for i in 0..n_samples {
        let z = i as f64 * SAMPLE_STEP_M;
        let fraction = interp1d(&xs, &ys, z);
        for (b, band) in CLOUD_BANDS.iter().enumerate() {
            if z >= band.bottom_m && z < band.top_m {
                sums[b] += fraction;
                counts[b] += 1;
            }
        }
    }

    let mut means = [0.0; CLOUD_BANDS.len()];
    for b in 0..CLOUD_BANDS.len() {
        if counts[b] > 0 {
            means[b] = sums[b] / counts[b] as f64;
        }
    }
    means
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_table_ranges() {
        assert_eq!(CLOUD_BANDS[0].name, "fog");
        assert_eq!(CLOUD_BANDS[3].top_m, 13_000.0);
        for band in &CLOUD_BANDS {
            assert!(band.top_m > band.bottom_m);
        }
    }

    #[test]
    fn test_all_zero_profile_yields_zero_everywhere() {
        let cloud = [0.0; 5];
        let heights = [100.0, 800.0, 3_000.0, 6_000.0, 12_000.0];
        let bands = band_fractions(&cloud, &heights);
        assert_eq!(bands, [0.0; 4]);
    }

    #[test]
    fn test_saturated_band_yields_exactly_one() {
        // Saturated everywhere the mid band samples; the mid band does not
        // touch the ground anchor, so its mean is exactly 1.
        let cloud = [1.0; 4];
        let heights = [500.0, 2_000.0, 8_000.0, 13_500.0];
        let bands = band_fractions(&cloud, &heights);
        let mid = bands[2];
        assert_eq!(mid, 1.0);
        // The high band is saturated across its whole range too
        assert_eq!(bands[3], 1.0);
    }

    #[test]
    fn test_ground_anchor_pulls_low_band_below_one() {
        // Saturated aloft but anchored to zero at the ground: the low band
        // mean must fall strictly between 0 and 1.
        let cloud = [1.0; 3];
        let heights = [1_000.0, 5_000.0, 12_000.0];
        let bands = band_fractions(&cloud, &heights);
        assert!(bands[1] > 0.0 && bands[1] < 1.0, "low = {}", bands[1]);
    }

    #[test]
    fn test_elevated_layer_stays_out_of_other_bands() {
        // A cloud layer confined between 8 and 12 km: fog and low see none
        // of it, high sees most of it.
        let cloud = [0.0, 0.0, 1.0, 1.0, 0.0];
        let heights = [500.0, 7_900.0, 8_000.0, 12_000.0, 12_100.0];
        let bands = band_fractions(&cloud, &heights);
        assert_eq!(bands[0], 0.0);
        assert_eq!(bands[1], 0.0);
        assert!(bands[3] > 0.4, "high = {}", bands[3]);
    }

    #[test]
    fn test_profile_above_top_is_clamped() {
        // Lowest model level above the high band top: every sample takes the
        // ground-to-first-level ramp, so all bands see partial cloud.
        let cloud = [0.5];
        // A single level is enough for banding even if wind interpolation
        // would reject it.
        let heights = [14_000.0];
        let bands = band_fractions(&cloud, &heights);
        assert!(bands[0] < bands[3]);
    }
}
