//! Scene data model: textures, materials, meshes, lights, camera, and the
//! per-frame behavior commands that mutate them.

use alloc::{string::String, vec::Vec};

use crate::{transform, Matrix4, Vector2, Vector3};

/// Dense grid of RGB samples in `[0, 1]`, three channels per texel.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<Vector3>,
}

impl Texture {
    /// Builds a texture from tightly packed 8-bit RGB rows.
    ///
    /// Truncates trailing bytes that do not form a full texel; a short buffer
    /// yields a correspondingly short texture.
    pub fn from_rgb8(width: u32, height: u32, bytes: &[u8]) -> Self {
        let texels = (width as usize * height as usize).min(bytes.len() / 3);
        let mut data = Vec::with_capacity(texels);
        for px in bytes.chunks_exact(3).take(texels) {
            data.push(Vector3::new(
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ));
        }
        Texture {
            width,
            height,
            channels: 3,
            data,
        }
    }

    /// Single-color texture.
    pub fn solid(color: Vector3, width: u32, height: u32) -> Self {
        let mut data = Vec::new();
        data.resize((width * height) as usize, color);
        Texture {
            width,
            height,
            channels: 3,
            data,
        }
    }

    /// The purple/black checkerboard substituted for model folders that ship
    /// no usable diffuse image.
    pub fn checkerboard() -> Self {
        const SIZE: u32 = 120;
        const CHECKER: u32 = 4;
        let purple = Vector3::new(0.5, 0.0, 0.5);
        let black = Vector3::zeros();
        let mut data = Vec::with_capacity((SIZE * SIZE) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                data.push(if ((x / CHECKER) + (y / CHECKER)) % 2 == 0 {
                    purple
                } else {
                    black
                });
            }
        }
        Texture {
            width: SIZE,
            height: SIZE,
            channels: 3,
            data,
        }
    }

    /// Nearest-texel lookup. `u`/`v` are clamped to `[0, 1]` and `v` grows
    /// upwards, so the sample row is flipped.
    pub fn sample(&self, u: f32, v: f32) -> Vector3 {
        if self.data.is_empty() {
            return Vector3::new(1.0, 1.0, 1.0);
        }
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let x = (u * (self.width.saturating_sub(1)) as f32) as u32;
        let y = ((1.0 - v) * (self.height.saturating_sub(1)) as f32) as u32;
        let idx = ((y * self.width + x) as usize).min(self.data.len() - 1);
        let c = self.data[idx];
        Vector3::new(c.x.clamp(0.0, 1.0), c.y.clamp(0.0, 1.0), c.z.clamp(0.0, 1.0))
    }
}

/// Surface description in MTL terms.
///
/// Textures are owned by the material that references them; a `None` texture
/// samples as opaque white.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Ka
    pub ambient: Vector3,
    /// Kd
    pub diffuse: Vector3,
    /// Ks
    pub specular: Vector3,
    /// Ns
    pub shininess: f32,
    /// d, mix factor against the scene background
    pub transparency: f32,
    /// illum tag, carried but not interpreted
    pub illum: i32,
    /// map_Kd
    pub diffuse_tex: Option<Texture>,
    /// map_Ks
    pub specular_tex: Option<Texture>,
    /// map_Bump; loaded but never sampled
    pub normal_tex: Option<Texture>,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            ambient: Vector3::new(0.2, 0.2, 0.2),
            diffuse: Vector3::new(0.8, 0.8, 0.8),
            specular: Vector3::new(1.0, 1.0, 1.0),
            shininess: 32.0,
            transparency: 1.0,
            illum: 2,
            diffuse_tex: None,
            specular_tex: None,
            normal_tex: None,
        }
    }
}

/// One triangle corner: world-space position, texture coordinate, and vertex
/// normal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub position: Vector3,
    pub uv: Vector2,
    pub normal: Vector3,
}

/// A triangle is a flat record of its three corners; winding is whatever the
/// source face gave.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    pub a: Vertex,
    pub b: Vertex,
    pub c: Vertex,
}

impl Triangle {
    pub fn corners(&self) -> [&Vertex; 3] {
        [&self.a, &self.b, &self.c]
    }

    pub fn corners_mut(&mut self) -> [&mut Vertex; 3] {
        [&mut self.a, &mut self.b, &mut self.c]
    }
}

/// Named triangle list with exactly one material. Every triangle of the mesh
/// is shaded with that material.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub name: String,
    pub triangles: Vec<Triangle>,
    pub material: Material,
}

impl Mesh {
    pub fn new(name: impl Into<String>, triangles: Vec<Triangle>, material: Material) -> Self {
        Mesh {
            name: name.into(),
            triangles,
            material,
        }
    }

    /// Applies `t` to every corner position, and the inverse-transpose of its
    /// linear part to every vertex normal, renormalizing afterwards.
    ///
    /// A singular `t` has no usable normal matrix; normals are left as they
    /// were in that case.
    pub fn transform(&mut self, t: &Matrix4) {
        let normal_mat = transform::inverse_transpose3(t);
        for tri in &mut self.triangles {
            for corner in tri.corners_mut() {
                corner.position = transform::transform_point(t, corner.position);
                if let Some(nm) = &normal_mat {
                    corner.normal = normalize_or_zero(nm * corner.normal);
                }
            }
        }
    }

    /// Applies `t` with the mesh center as the origin:
    /// `translate(-center) · t · translate(+center)`.
    pub fn transform_about_center(&mut self, t: &Matrix4) {
        let center = self.center();
        self.transform(&transform::translation(-center.x, -center.y, -center.z));
        self.transform(t);
        self.transform(&transform::translation(center.x, center.y, center.z));
    }

    /// Mean of all triangle corners. Positions shared between triangles count
    /// once per corner, which keeps the rotation pivot consistent with the
    /// move-toward commands.
    pub fn center(&self) -> Vector3 {
        let corners = self.triangles.len() * 3;
        if corners == 0 {
            return Vector3::zeros();
        }
        let mut sum = Vector3::zeros();
        for tri in &self.triangles {
            sum += tri.a.position + tri.b.position + tri.c.position;
        }
        sum / corners as f32
    }
}

/// Point light. Fragments farther than `radius` receive nothing from it.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    pub position: Vector3,
    /// RGB in `[0, 1]`.
    pub color: Vector3,
    pub brightness: f32,
    pub radius: f32,
}

impl Light {
    pub fn new(position: Vector3, color: Vector3, brightness: f32, radius: f32) -> Self {
        Light {
            position,
            color,
            brightness,
            radius,
        }
    }

    /// Convenience constructor for 8-bit color channels.
    pub fn from_rgb8(position: Vector3, r: u8, g: u8, b: u8, brightness: f32, radius: f32) -> Self {
        Light::new(
            position,
            Vector3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0),
            brightness,
            radius,
        )
    }
}

/// First-person camera.
///
/// `rotation` is rebuilt as `Rx(pitch) · Ry(yaw)` after every input event;
/// roll is not represented.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Camera {
    pub position: Vector3,
    pub rotation: Matrix4,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            position: Vector3::zeros(),
            rotation: Matrix4::identity(),
            fov: 70.0,
            aspect: 1.0,
            near: 0.2,
            far: 500.0,
            yaw: 0.0,
            pitch: 0.0,
            speed: 0.5,
        }
    }
}

impl Camera {
    pub fn new(position: Vector3, fov: f32, speed: f32) -> Self {
        Camera {
            position,
            fov,
            speed,
            ..Camera::default()
        }
    }

    /// Recomputes `rotation` from the current yaw and pitch.
    pub fn rebuild_rotation(&mut self) {
        self.rotation = transform::rotation_x(self.pitch) * transform::rotation_y(self.yaw);
    }

    /// World-to-view matrix: rotate after moving the camera to the origin.
    pub fn view_matrix(&self) -> Matrix4 {
        self.rotation
            * transform::translation(-self.position.x, -self.position.y, -self.position.z)
    }
}

/// When a behavior fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Trigger {
    /// Only on the very first frame.
    Startup,
    /// Every frame.
    Continuous,
}

/// Which meshes a command addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeshSel {
    Index(usize),
    Name(String),
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Scene mutation executed by the per-frame driver.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Rotate the targets around their own centers.
    Rotate {
        target: MeshSel,
        axis: Axis,
        degrees: f32,
    },
    /// Step the targets towards a fixed point.
    MoveTo {
        target: MeshSel,
        to: Vector3,
        step: f32,
    },
    /// Step `source` towards the center of `dest`.
    MoveTowardMesh {
        source: MeshSel,
        dest: MeshSel,
        step: f32,
    },
    /// Scale the targets about their own centers.
    Scale { target: MeshSel, factors: Vector3 },
    /// Replace the targets' diffuse texture with a solid color.
    Colorize { target: MeshSel, color: Vector3 },
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Behavior {
    pub trigger: Trigger,
    pub command: Command,
}

/// Everything the renderer draws in one frame: meshes, lights, camera,
/// background, the output size in character cells, and the attached
/// behaviors.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub lights: Vec<Light>,
    pub camera: Camera,
    /// RGB in `[0, 1]`.
    pub background: Vector3,
    pub width: usize,
    pub height: usize,
    pub frame_count: u64,
    pub running: bool,
    pub behaviors: Vec<Behavior>,
}

impl Scene {
    /// Width and height are clamped to at least one cell.
    pub fn new(camera: Camera, width: usize, height: usize, background: Vector3) -> Self {
        Scene {
            meshes: Vec::new(),
            lights: Vec::new(),
            camera,
            background,
            width: width.max(1),
            height: height.max(1),
            frame_count: 0,
            running: true,
            behaviors: Vec::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn add_behavior(&mut self, trigger: Trigger, command: Command) {
        self.behaviors.push(Behavior { trigger, command });
    }

    /// Drops all meshes and behaviors (releasing their triangles, materials
    /// and textures), rewinds the frame counter, restores the default camera
    /// position, field of view, and speed, and returns the output size to
    /// 800×600 cells. Camera orientation and frustum planes stay as they
    /// are, and lights stay attached.
    pub fn reset(&mut self) {
        self.meshes.clear();
        self.behaviors.clear();
        self.camera.position = Vector3::zeros();
        self.camera.fov = 70.0;
        self.camera.speed = 0.5;
        self.background = Vector3::zeros();
        self.width = 800;
        self.height = 600;
        self.frame_count = 0;
    }

    /// Executes the attached behaviors once. Startup commands only fire while
    /// the frame counter is still zero.
    pub fn run_behaviors(&mut self) {
        let behaviors = core::mem::take(&mut self.behaviors);
        for behavior in &behaviors {
            match behavior.trigger {
                Trigger::Startup if self.frame_count != 0 => continue,
                _ => self.execute(&behavior.command),
            }
        }
        self.behaviors = behaviors;
    }

    fn execute(&mut self, command: &Command) {
        match command {
            Command::Rotate {
                target,
                axis,
                degrees,
            } => {
                let mat = match axis {
                    Axis::X => transform::rotation_x(degrees.to_radians()),
                    Axis::Y => transform::rotation_y(degrees.to_radians()),
                    Axis::Z => transform::rotation_z(degrees.to_radians()),
                };
                for idx in self.select(target) {
                    self.meshes[idx].transform_about_center(&mat);
                }
            }
            Command::MoveTo { target, to, step } => {
                for idx in self.select(target) {
                    let dir = normalize_or_zero(*to - self.meshes[idx].center()) * *step;
                    self.meshes[idx].transform(&transform::translation(dir.x, dir.y, dir.z));
                }
            }
            Command::MoveTowardMesh { source, dest, step } => {
                let src = self.select(source).first().copied();
                let dst = self.select(dest).first().copied();
                let (Some(src), Some(dst)) = (src, dst) else {
                    return;
                };
                if src == dst {
                    return;
                }
                let dir =
                    normalize_or_zero(self.meshes[dst].center() - self.meshes[src].center()) * *step;
                self.meshes[src].transform(&transform::translation(dir.x, dir.y, dir.z));
            }
            Command::Scale { target, factors } => {
                let mat = transform::scaling(factors.x, factors.y, factors.z);
                for idx in self.select(target) {
                    self.meshes[idx].transform_about_center(&mat);
                }
            }
            Command::Colorize { target, color } => {
                for idx in self.select(target) {
                    self.meshes[idx].material.diffuse_tex = Some(Texture::solid(*color, 128, 128));
                }
            }
        }
    }

    fn select(&self, sel: &MeshSel) -> Vec<usize> {
        match sel {
            MeshSel::Index(i) => {
                if *i < self.meshes.len() {
                    alloc::vec![*i]
                } else {
                    Vec::new()
                }
            }
            MeshSel::Name(name) => (0..self.meshes.len())
                .filter(|&i| self.meshes[i].name == *name)
                .collect(),
            MeshSel::All => (0..self.meshes.len()).collect(),
        }
    }
}

/// Normalizes `v`, leaving the zero vector untouched.
pub(crate) fn normalize_or_zero(v: Vector3) -> Vector3 {
    let norm = libm::sqrtf(v.dot(&v));
    if norm != 0.0 {
        v / norm
    } else {
        v
    }
}
