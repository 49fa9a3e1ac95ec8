//! Rotation of horizontal vector fields between grid and earth axes.
//!
//! Map projections rotate the model's grid axes away from true east/north
//! by a per-column angle. The input file supplies the cosine and sine of
//! that angle; the rotation itself is a plain 2D rotation applied to the
//! whole array at once.

use ndarray::{Array3, Array4, Axis, Zip};

/// Rotate grid-relative wind components onto earth-relative (east/north)
/// axes. The angle fields are (time, y, x) and broadcast over the height
/// axis of the (time, height, y, x) wind fields.
pub fn rotate_to_earth(
    u_grid: &Array4<f64>,
    v_grid: &Array4<f64>,
    cos_alpha: &Array3<f64>,
    sin_alpha: &Array3<f64>,
) -> (Array4<f64>, Array4<f64>) {
    rotate(u_grid, v_grid, cos_alpha, sin_alpha, false)
}

/// Rotate earth-relative wind components back onto the grid axes
/// (the inverse rotation, i.e. the angle negated).
pub fn rotate_to_grid(
    u_earth: &Array4<f64>,
    v_earth: &Array4<f64>,
    cos_alpha: &Array3<f64>,
    sin_alpha: &Array3<f64>,
) -> (Array4<f64>, Array4<f64>) {
    rotate(u_earth, v_earth, cos_alpha, sin_alpha, true)
}

fn rotate(
    u: &Array4<f64>,
    v: &Array4<f64>,
    cos_alpha: &Array3<f64>,
    sin_alpha: &Array3<f64>,
    invert: bool,
) -> (Array4<f64>, Array4<f64>) {
    debug_assert_eq!(u.dim(), v.dim());

    let mut u_rot = Array4::<f64>::zeros(u.dim());
    let mut v_rot = Array4::<f64>::zeros(v.dim());
    let sign = if invert { -1.0 } else { 1.0 };

    let n_heights = u.len_of(Axis(1));
    for h in 0..n_heights {
        Zip::from(u_rot.index_axis_mut(Axis(1), h))
            .and(v_rot.index_axis_mut(Axis(1), h))
            .and(u.index_axis(Axis(1), h))
            .and(v.index_axis(Axis(1), h))
            .and(cos_alpha)
            .and(sin_alpha)
            .for_each(|ur, vr, &uc, &vc, &cos_a, &sin_a| {
                let sin_a = sign * sin_a;
                *ur = uc * cos_a - vc * sin_a;
                *vr = vc * cos_a + uc * sin_a;
            });
    }

    (u_rot, v_rot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_fields(angle: f64) -> (Array3<f64>, Array3<f64>) {
        (
            Array3::from_elem((1, 2, 2), angle.cos()),
            Array3::from_elem((1, 2, 2), angle.sin()),
        )
    }

    #[test]
    fn test_zero_angle_is_identity() {
        let u = Array4::from_elem((1, 3, 2, 2), 4.0);
        let v = Array4::from_elem((1, 3, 2, 2), -2.0);
        let (cos_a, sin_a) = angle_fields(0.0);
        let (ue, ve) = rotate_to_earth(&u, &v, &cos_a, &sin_a);
        assert_eq!(ue, u);
        assert_eq!(ve, v);
    }

    #[test]
    fn test_quarter_turn() {
        // With alpha = 90 degrees, (u, v) = (1, 0) maps to (0, 1)
        let mut u = Array4::zeros((1, 1, 2, 2));
        u.fill(1.0);
        let v = Array4::zeros((1, 1, 2, 2));
        let (cos_a, sin_a) = angle_fields(std::f64::consts::FRAC_PI_2);
        let (ue, ve) = rotate_to_earth(&u, &v, &cos_a, &sin_a);
        for (&x, &y) in ue.iter().zip(ve.iter()) {
            assert!(x.abs() < 1e-12);
            assert!((y - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rotation_composed_with_inverse_is_identity() {
        let mut u = Array4::zeros((1, 2, 2, 2));
        let mut v = Array4::zeros((1, 2, 2, 2));
        for (i, val) in u.iter_mut().enumerate() {
            *val = i as f64 - 3.0;
        }
        for (i, val) in v.iter_mut().enumerate() {
            *val = 0.5 * i as f64 + 1.0;
        }
        let (cos_a, sin_a) = angle_fields(0.37);

        let (ue, ve) = rotate_to_earth(&u, &v, &cos_a, &sin_a);
        let (ub, vb) = rotate_to_grid(&ue, &ve, &cos_a, &sin_a);

        for (orig, back) in u.iter().zip(ub.iter()) {
            assert!((orig - back).abs() < 1e-12);
        }
        for (orig, back) in v.iter().zip(vb.iter()) {
            assert!((orig - back).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rotation_preserves_speed() {
        let u = Array4::from_elem((1, 1, 2, 2), 3.0);
        let v = Array4::from_elem((1, 1, 2, 2), 4.0);
        let (cos_a, sin_a) = angle_fields(-1.1);
        let (ue, ve) = rotate_to_earth(&u, &v, &cos_a, &sin_a);
        for (&x, &y) in ue.iter().zip(ve.iter()) {
            assert!(((x * x + y * y).sqrt() - 5.0).abs() < 1e-12);
        }
    }
}
