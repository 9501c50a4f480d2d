//! # blockrend
//!
//! ```text
//! ██████╗ ██╗      ██████╗  ██████╗██╗  ██╗
//! ██╔══██╗██║     ██╔═══██╗██╔════╝██║ ██╔╝
//! ██████╔╝██║     ██║   ██║██║     █████╔╝
//! ██╔══██╗██║     ██║   ██║██║     ██╔═██╗
//! ██████╔╝███████╗╚██████╔╝╚██████╗██║  ██╗
//! ╚═════╝ ╚══════╝ ╚═════╝  ╚═════╝╚═╝  ╚═╝
//! ```
//!
//! ## Textured triangle rasterizer for terminal cells
//!
//! `blockrend` is a `no_std` compatible CPU renderer that draws textured,
//! Blinn–Phong-lit meshes into a character grid, one full-block glyph plus a
//! 24-bit color per cell. Each frame runs through the same stages:
//!
//! - Near-plane clipping in clip space (Sutherland–Hodgman against a single
//!   plane), with optional backface culling.
//! - Barycentric edge-function rasterization with perspective-correct
//!   attribute interpolation and a depth buffer.
//! - Per-sample Blinn–Phong shading with diffuse texturing and a flat
//!   transparency mix against the background.
//!
//! The result is a typed [`Frame`] (glyph grid + color grid); transporting it
//! to a terminal is the caller's business, with [`Frame::encode_ansi`]
//! producing the default 24-bit escape encoding.
//!
//! Entrypoint to rendering is the [`Renderer`] struct; [`scene::Scene`] holds
//! what it draws. With the `std` feature, [`obj`] loads Wavefront model
//! folders, and the `crossterm` feature adds terminal input plumbing under
//! [`extra`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;

use nalgebra as na;

pub mod frame;
pub mod scene;
pub mod shade;
pub mod transform;

#[cfg(feature = "std")]
pub mod extra;
#[cfg(feature = "std")]
pub mod obj;

pub use frame::{Frame, Rgb8, PIXEL_GLYPH};
pub use scene::{Camera, Light, Material, Mesh, Scene, Texture, Triangle, Vertex};

pub type Vector2 = na::Vector2<f32>;
pub type Vector3 = na::Vector3<f32>;
pub type Vector4 = na::Vector4<f32>;
pub type Matrix3 = na::Matrix3<f32>;
pub type Matrix4 = na::Matrix4<f32>;

/// Signed parallelogram area spanned by `c` relative to edge `(a, b)`; the
/// sign encodes which side of the edge the point lies on.
fn edge_function(a: Vector2, b: Vector2, c: Vector2) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (b.x - a.x) * (c.y - a.y)
}

/// One corner during clipping, carrying every attribute the rasterizer will
/// later interpolate.
#[derive(Clone, Copy, Debug)]
struct ClipVertex {
    clip: Vector4,
    world: Vector3,
    normal: Vector3,
    uv: Vector2,
}

impl ClipVertex {
    fn lerp(a: &ClipVertex, b: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: a.clip + (b.clip - a.clip) * t,
            world: a.world + (b.world - a.world) * t,
            normal: a.normal + (b.normal - a.normal) * t,
            uv: a.uv + (b.uv - a.uv) * t,
        }
    }
}

fn inside_near(v: &ClipVertex) -> bool {
    v.clip.z + v.clip.w >= 0.0
}

/// Intersection of segment `(a, b)` with the near plane `z + w = 0`. All
/// attributes ride along on the same parameter.
fn near_intersect(a: &ClipVertex, b: &ClipVertex) -> ClipVertex {
    let ad = a.clip.z + a.clip.w;
    let bd = b.clip.z + b.clip.w;
    ClipVertex::lerp(a, b, ad / (ad - bd))
}

fn to_clip(tri: &Triangle, view_proj: &Matrix4) -> [ClipVertex; 3] {
    [&tri.a, &tri.b, &tri.c].map(|v| ClipVertex {
        clip: transform::project_point(view_proj, v.position),
        world: v.position,
        normal: v.normal,
        uv: v.uv,
    })
}

/// Sutherland–Hodgman pass of a triangle against the near plane. A single
/// plane can only grow the polygon by one corner, so the output is 0, 3, or 4
/// vertices.
fn clip_triangle_near(input: &[ClipVertex; 3]) -> ([ClipVertex; 4], usize) {
    let mut out = [input[0]; 4];
    let mut count = 0;
    let mut push = |v: ClipVertex| {
        out[count] = v;
        count += 1;
    };

    for i in 0..3 {
        let current = &input[i];
        let next = &input[(i + 1) % 3];
        match (inside_near(current), inside_near(next)) {
            (true, true) => push(*next),
            (true, false) => push(near_intersect(current, next)),
            (false, true) => {
                push(near_intersect(current, next));
                push(*next);
            }
            (false, false) => {}
        }
    }

    (out, count)
}

fn world_triangle(a: &ClipVertex, b: &ClipVertex, c: &ClipVertex) -> Triangle {
    let vertex = |v: &ClipVertex| Vertex {
        position: v.world,
        uv: v.uv,
        normal: v.normal,
    };
    Triangle {
        a: vertex(a),
        b: vertex(b),
        c: vertex(c),
    }
}

/// World-space backface test: a triangle faces away when its winding normal
/// points along the camera-to-triangle direction.
fn backfacing(tri: &Triangle, camera_pos: Vector3) -> bool {
    let u = tri.b.position - tri.a.position;
    let v = tri.c.position - tri.a.position;
    let normal = u.cross(&v);
    normal.dot(&(tri.a.position - camera_pos)) >= 0.0
}

/// Renderer settings that survive across frames.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOptions {
    /// Cull triangles whose winding faces away from the camera.
    pub backface_culling: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            backface_culling: true,
        }
    }
}

/// The per-frame driver.
///
/// Owns the scratch state that persists between frames (the depth buffer and
/// the output [`Frame`]); both are resized and cleared at frame start rather
/// than reallocated. One [`Renderer::update`] call runs the attached scene
/// behaviors, draws every mesh in insertion order, bumps the scene's frame
/// counter, and hands back the finished frame.
#[derive(Debug, Default)]
pub struct Renderer {
    pub options: RenderOptions,
    depth: Vec<f32>,
    frame: Frame,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders one frame of `scene`.
    pub fn update(&mut self, scene: &mut Scene) -> &Frame {
        scene.run_behaviors();

        let width = scene.width.max(1);
        let height = scene.height.max(1);
        self.frame
            .reset(width, height, Rgb8::from_unit(scene.background));
        self.depth.clear();
        self.depth.resize(width * height, f32::INFINITY);

        let camera = &scene.camera;
        let projection =
            transform::perspective(camera.near, camera.far, camera.fov, camera.aspect);
        let view_proj = projection * camera.view_matrix();

        for mesh in &scene.meshes {
            for tri in &mesh.triangles {
                self.draw_triangle(scene, &mesh.material, tri, &view_proj);
            }
        }

        scene.frame_count += 1;
        &self.frame
    }

    /// The frame produced by the last [`Renderer::update`] call.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    fn draw_triangle(
        &mut self,
        scene: &Scene,
        material: &Material,
        tri: &Triangle,
        view_proj: &Matrix4,
    ) {
        let (clipped, count) = clip_triangle_near(&to_clip(tri, view_proj));
        if count < 3 {
            return;
        }

        // A quad from clipping fans into (0, 1, 2), (0, 2, 3).
        let fans = [[0, 1, 2], [0, 2, 3]];
        for fan in fans.iter().take(count - 2) {
            let world = world_triangle(&clipped[fan[0]], &clipped[fan[1]], &clipped[fan[2]]);
            if self.options.backface_culling && backfacing(&world, scene.camera.position) {
                continue;
            }

            let mut ndc = [Vector3::zeros(); 3];
            let mut w_clip = [0.0f32; 3];
            for (i, corner) in world.corners().into_iter().enumerate() {
                let clip = transform::project_point(view_proj, corner.position);
                ndc[i] = clip.xyz() / clip.w;
                w_clip[i] = clip.w;
            }

            if outside_ndc_bounds(&ndc) {
                continue;
            }

            self.rasterize(scene, material, &world, &ndc, &w_clip);
        }
    }

    fn rasterize(
        &mut self,
        scene: &Scene,
        material: &Material,
        tri: &Triangle,
        ndc: &[Vector3; 3],
        w_clip: &[f32; 3],
    ) {
        let width = self.frame.width();
        let height = self.frame.height();

        let to_pixels = |v: &Vector3| {
            Vector2::new(
                (v.x + 1.0) * 0.5 * width as f32,
                (1.0 - v.y) * 0.5 * height as f32,
            )
        };
        let p = [to_pixels(&ndc[0]), to_pixels(&ndc[1]), to_pixels(&ndc[2])];

        let min_x = (p[0].x.min(p[1].x).min(p[2].x) as i32).max(0);
        let max_x = (p[0].x.max(p[1].x).max(p[2].x) as i32).min(width as i32 - 1);
        let min_y = (p[0].y.min(p[1].y).min(p[2].y) as i32).max(0);
        let max_y = (p[0].y.max(p[1].y).max(p[2].y) as i32).min(height as i32 - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let area = edge_function(p[0], p[1], p[2]);
        if area == 0.0 {
            return;
        }

        let inv_w = [1.0 / w_clip[0], 1.0 / w_clip[1], 1.0 / w_clip[2]];

        for y in min_y as usize..=max_y as usize {
            for x in min_x as usize..=max_x as usize {
                let sample = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge_function(p[1], p[2], sample) / area;
                let w1 = edge_function(p[2], p[0], sample) / area;
                let w2 = edge_function(p[0], p[1], sample) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let weights = [w0 * inv_w[0], w1 * inv_w[1], w2 * inv_w[2]];
                let denom = weights[0] + weights[1] + weights[2];
                if denom == 0.0 {
                    continue;
                }

                let z = (ndc[0].z * weights[0] + ndc[1].z * weights[1] + ndc[2].z * weights[2])
                    / denom;
                let idx = y * width + x;
                if z >= self.depth[idx] {
                    continue;
                }
                self.depth[idx] = z;

                let interp2 = |a: Vector2, b: Vector2, c: Vector2| {
                    (a * weights[0] + b * weights[1] + c * weights[2]) / denom
                };
                let interp3 = |a: Vector3, b: Vector3, c: Vector3| {
                    (a * weights[0] + b * weights[1] + c * weights[2]) / denom
                };

                let uv = interp2(tri.a.uv, tri.b.uv, tri.c.uv);
                let world_pos = interp3(tri.a.position, tri.b.position, tri.c.position);
                let normal =
                    scene::normalize_or_zero(interp3(tri.a.normal, tri.b.normal, tri.c.normal));

                let color = shade::shade_sample(
                    normal,
                    world_pos,
                    material,
                    &scene.lights,
                    scene.camera.position,
                    scene.background,
                    uv.x,
                    uv.y,
                );
                self.frame.put(x, y, PIXEL_GLYPH, Rgb8::from_unit(color));
            }
        }
    }
}

/// True when all three corners sit strictly beyond the same NDC bound.
fn outside_ndc_bounds(ndc: &[Vector3; 3]) -> bool {
    ndc.iter().all(|v| v.x < -1.0)
        || ndc.iter().all(|v| v.x > 1.0)
        || ndc.iter().all(|v| v.y < -1.0)
        || ndc.iter().all(|v| v.y > 1.0)
        || ndc.iter().all(|v| v.z < -1.0)
        || ndc.iter().all(|v| v.z > 1.0)
}
