//! Matrix constructors used throughout the pipeline.
//!
//! All rotation constructors negate the incoming angle, so a positive angle
//! spins clockwise when looking from the positive axis towards the origin.
//! Scene commands and the camera controller feed raw angles in and depend on
//! that orientation.

use crate::{Matrix3, Matrix4, Vector3, Vector4};
use nalgebra as na;

/// Perspective projection for a right-handed, looking-down-negative-Z camera.
///
/// `fov` is the vertical field of view in degrees. Requires `near > 0` and
/// `far > near`; [`crate::scene::Camera`] upholds this for matrices built from
/// its fields.
pub fn perspective(near: f32, far: f32, fov: f32, aspect: f32) -> Matrix4 {
    let f = 1.0 / libm::tanf(0.5 * fov.to_radians());
    na::matrix![
        f / aspect, 0.0, 0.0, 0.0;
        0.0, f, 0.0, 0.0;
        0.0, 0.0, (far + near) / (near - far), (2.0 * far * near) / (near - far);
        0.0, 0.0, -1.0, 0.0
    ]
}

/// Rotation around the X axis.
pub fn rotation_x(theta: f32) -> Matrix4 {
    let cos = libm::cosf(-theta);
    let sin = libm::sinf(-theta);
    na::matrix![
        1.0, 0.0, 0.0, 0.0;
        0.0, cos, -sin, 0.0;
        0.0, sin, cos, 0.0;
        0.0, 0.0, 0.0, 1.0
    ]
}

/// Rotation around the Y axis.
pub fn rotation_y(theta: f32) -> Matrix4 {
    let cos = libm::cosf(-theta);
    let sin = libm::sinf(-theta);
    na::matrix![
        cos, 0.0, sin, 0.0;
        0.0, 1.0, 0.0, 0.0;
        -sin, 0.0, cos, 0.0;
        0.0, 0.0, 0.0, 1.0
    ]
}

/// Rotation around the Z axis.
pub fn rotation_z(theta: f32) -> Matrix4 {
    let cos = libm::cosf(-theta);
    let sin = libm::sinf(-theta);
    na::matrix![
        cos, -sin, 0.0, 0.0;
        sin, cos, 0.0, 0.0;
        0.0, 0.0, 1.0, 0.0;
        0.0, 0.0, 0.0, 1.0
    ]
}

/// Translation by `(x, y, z)`.
pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
    na::matrix![
        1.0, 0.0, 0.0, x;
        0.0, 1.0, 0.0, y;
        0.0, 0.0, 1.0, z;
        0.0, 0.0, 0.0, 1.0
    ]
}

/// Non-uniform scale by `(x, y, z)`.
pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
    na::matrix![
        x, 0.0, 0.0, 0.0;
        0.0, y, 0.0, 0.0;
        0.0, 0.0, z, 0.0;
        0.0, 0.0, 0.0, 1.0
    ]
}

/// Applies the affine part of `m` to a point, ignoring the projective row.
pub fn transform_point(m: &Matrix4, p: Vector3) -> Vector3 {
    Vector3::new(
        m[(0, 0)] * p.x + m[(0, 1)] * p.y + m[(0, 2)] * p.z + m[(0, 3)],
        m[(1, 0)] * p.x + m[(1, 1)] * p.y + m[(1, 2)] * p.z + m[(1, 3)],
        m[(2, 0)] * p.x + m[(2, 1)] * p.y + m[(2, 2)] * p.z + m[(2, 3)],
    )
}

/// Applies `m` to a point with an implied `w = 1`, keeping the full
/// homogeneous result.
pub fn project_point(m: &Matrix4, p: Vector3) -> Vector4 {
    m * Vector4::new(p.x, p.y, p.z, 1.0)
}

/// Inverse-transpose of the upper-left 3×3 of `m`, the matrix that carries
/// normals through a non-uniform scale.
///
/// Returns `None` when the linear part is singular.
pub fn inverse_transpose3(m: &Matrix4) -> Option<Matrix3> {
    let linear: Matrix3 = m.fixed_view::<3, 3>(0, 0).into_owned();
    linear.try_inverse().map(|inv| inv.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frustum_point_lands_in_ndc() {
        let proj = perspective(0.2, 500.0, 90.0, 1.0);
        let clip = project_point(&proj, Vector3::new(1.0, -2.0, -10.0));
        assert!(clip.w > 0.0);
        let ndc = clip.xyz() / clip.w;
        for c in [ndc.x, ndc.y, ndc.z] {
            assert!(c > -1.0 && c < 1.0, "ndc component {c} out of range");
        }
    }

    #[test]
    fn projection_depth_is_monotonic() {
        let proj = perspective(0.2, 500.0, 70.0, 1.0);
        let z = |d: f32| {
            let clip = project_point(&proj, Vector3::new(0.0, 0.0, d));
            clip.z / clip.w
        };
        assert!(z(-1.0) < z(-5.0));
        assert!(z(-5.0) < z(-100.0));
        assert!((z(-0.2) - -1.0).abs() < 1e-4);
    }

    #[test]
    fn rotation_y_is_clockwise_from_positive_axis() {
        let rot = rotation_y(core::f32::consts::FRAC_PI_2);
        let v = transform_point(&rot, Vector3::new(1.0, 0.0, 0.0));
        assert!((v - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn rotation_x_is_clockwise_from_positive_axis() {
        let rot = rotation_x(core::f32::consts::FRAC_PI_2);
        let v = transform_point(&rot, Vector3::new(0.0, 1.0, 0.0));
        assert!((v - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }

    #[test]
    fn inverse_transpose_undoes_nonuniform_scale() {
        let m = scaling(2.0, 1.0, 1.0);
        let nm = inverse_transpose3(&m).unwrap();
        assert!((nm * Vector3::new(1.0, 0.0, 0.0) - Vector3::new(0.5, 0.0, 0.0)).norm() < 1e-6);
        assert!((nm * Vector3::new(0.0, 1.0, 0.0) - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn inverse_transpose_rejects_singular() {
        assert!(inverse_transpose3(&scaling(0.0, 1.0, 1.0)).is_none());
    }
}
