//! Blinn–Phong shading for rasterized samples.

use crate::scene::{normalize_or_zero, Light, Material, Texture};
use crate::Vector3;

fn clamp01(v: Vector3) -> Vector3 {
    Vector3::new(v.x.clamp(0.0, 1.0), v.y.clamp(0.0, 1.0), v.z.clamp(0.0, 1.0))
}

/// Samples a texture, treating an absent one as opaque white.
pub fn sample_or_white(tex: Option<&Texture>, u: f32, v: f32) -> Vector3 {
    match tex {
        Some(tex) => tex.sample(u, v),
        None => Vector3::new(1.0, 1.0, 1.0),
    }
}

/// Accumulates the ambient, diffuse, and specular terms for one sample, each
/// clamped to `[0, 1]`.
///
/// Lights beyond their radius contribute nothing. Distance attenuation
/// applies to the specular term only; the diffuse term is accumulated
/// unattenuated.
pub fn blinn_phong(
    normal: Vector3,
    world_pos: Vector3,
    material: &Material,
    lights: &[Light],
    camera_pos: Vector3,
) -> (Vector3, Vector3, Vector3) {
    let ambient = material.ambient;
    let mut diffuse = Vector3::zeros();
    let mut specular = Vector3::zeros();

    for light in lights {
        let to_light = light.position - world_pos;
        let dist = libm::sqrtf(to_light.dot(&to_light)).max(1e-4);
        if dist > light.radius {
            continue;
        }
        let to_light = normalize_or_zero(to_light);

        let n_dot_l = normal.dot(&to_light).max(0.0);
        if n_dot_l <= 0.0 {
            continue;
        }

        let view = normalize_or_zero(camera_pos - world_pos);
        let half = normalize_or_zero(view + to_light);
        let n_dot_h = normal.dot(&half).max(0.0);
        let spec_factor = libm::powf(n_dot_h, material.shininess);

        let ratio = dist / light.radius;
        let attenuation = 1.0 / (1.0 + ratio * ratio);

        let intensity = light.color * light.brightness;
        diffuse += material.diffuse.component_mul(&intensity) * n_dot_l;
        specular += material.specular.component_mul(&intensity) * spec_factor * attenuation;
    }

    (clamp01(ambient), clamp01(diffuse), clamp01(specular))
}

/// Full per-sample color: lighting, diffuse texture, and the transparency mix
/// against the scene background. The result is clamped to `[0, 1]`.
pub fn shade_sample(
    normal: Vector3,
    world_pos: Vector3,
    material: &Material,
    lights: &[Light],
    camera_pos: Vector3,
    background: Vector3,
    u: f32,
    v: f32,
) -> Vector3 {
    let (ambient, diffuse, specular) =
        blinn_phong(normal, world_pos, material, lights, camera_pos);
    let tex = sample_or_white(material.diffuse_tex.as_ref(), u, v);

    let lit = (ambient + diffuse).component_mul(&tex) + specular;
    let mixed = background * (1.0 - material.transparency) + lit * material.transparency;
    clamp01(mixed)
}
