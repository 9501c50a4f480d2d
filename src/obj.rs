//! Wavefront OBJ/MTL loading and smooth-normal synthesis.
//!
//! The loader understands the subset of the formats the renderer consumes:
//! `v`/`vt`/`vn`/`s`/`f` on the OBJ side, and `newmtl`/`Ka`/`Kd`/`Ks`/`Ns`/
//! `d`/`map_Kd`/`map_Ks`/`map_Bump` on the MTL side. Faces with more than
//! three corners are fan-triangulated. Malformed lines are skipped with a
//! single warning per file.
//!
//! Image decoding is pluggable through [`TextureSource`]; enable the `image`
//! feature for a ready-made implementation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::scene::{Material, Mesh, Texture, Triangle, Vertex};
use crate::{Vector2, Vector3};

/// Decoded RGB raster handed over by a [`TextureSource`].
#[derive(Clone, Debug)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed 8-bit RGB rows, three bytes per pixel.
    pub data: Vec<u8>,
}

/// A failed image decode. Non-fatal: the loader logs it and leaves the
/// texture slot empty, which samples as opaque white.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode {}: {reason}", path.display())]
pub struct TextureError {
    pub path: PathBuf,
    pub reason: String,
}

/// Pluggable image decoder the loader resolves texture files through.
pub trait TextureSource {
    fn decode(&mut self, path: &Path) -> Result<RgbImage, TextureError>;
}

/// [`TextureSource`] backed by the `image` crate.
#[cfg(feature = "image")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageTextureSource;

#[cfg(feature = "image")]
impl TextureSource for ImageTextureSource {
    fn decode(&mut self, path: &Path) -> Result<RgbImage, TextureError> {
        let err = |reason: String| TextureError {
            path: path.to_path_buf(),
            reason,
        };
        let decoded = image::ImageReader::open(path)
            .map_err(|e| err(e.to_string()))?
            .decode()
            .map_err(|e| err(e.to_string()))?
            .to_rgb8();
        Ok(RgbImage {
            width: decoded.width(),
            height: decoded.height(),
            data: decoded.into_raw(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no .obj file found in {}", dir.display())]
    NoObj { dir: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Loader switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoadOptions {
    /// Synthesize averaged vertex normals even when the OBJ does not ask for
    /// smooth shading.
    pub force_smooth: bool,
}

/// Parsed OBJ contents: triangles with resolved attributes plus the
/// smooth-shading flag.
#[derive(Clone, Debug, Default)]
pub struct ObjData {
    pub triangles: Vec<Triangle>,
    pub smooth: bool,
}

/// One corner reference of a face directive, with the 1-based indices already
/// resolved to list positions. Absent or zero indices become `None` here and
/// never leak past the parser.
#[derive(Clone, Copy, Debug)]
struct FaceRef {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

fn parse_face_ref(token: &str) -> Option<FaceRef> {
    let mut parts = token.split('/');
    let position: usize = parts.next()?.parse().ok()?;
    if position == 0 {
        return None;
    }
    let uv = match parts.next() {
        Some("") | None => None,
        Some(s) => Some(s.parse::<usize>().ok()?),
    };
    let normal = match parts.next() {
        Some("") | None => None,
        Some(s) => Some(s.parse::<usize>().ok()?),
    };
    Some(FaceRef {
        position: position - 1,
        uv: uv.filter(|&i| i != 0).map(|i| i - 1),
        normal: normal.filter(|&i| i != 0).map(|i| i - 1),
    })
}

fn parse_floats<const N: usize>(parts: &mut core::str::SplitWhitespace<'_>) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    for slot in &mut out {
        *slot = parts.next()?.parse().ok()?;
    }
    Some(out)
}

/// Parses OBJ text. Unknown directives (including `g`, `mtllib`, `usemtl`)
/// are ignored.
pub fn parse_obj(text: &str) -> ObjData {
    let mut positions: Vec<Vector3> = Vec::new();
    let mut uvs: Vec<Vector2> = Vec::new();
    let mut normals: Vec<Vector3> = Vec::new();
    let mut out = ObjData::default();
    let mut warned = false;
    let mut warn = |line_no: usize| {
        if !warned {
            tracing::warn!(line = line_no, "skipping malformed OBJ line");
            warned = true;
        }
    };

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => match parse_floats::<3>(&mut parts) {
                Some([x, y, z]) => positions.push(Vector3::new(x, y, z)),
                None => warn(line_no + 1),
            },
            Some("vt") => match parse_floats::<2>(&mut parts) {
                Some([u, v]) => uvs.push(Vector2::new(u, v)),
                None => warn(line_no + 1),
            },
            Some("vn") => match parse_floats::<3>(&mut parts) {
                Some([x, y, z]) => normals.push(Vector3::new(x, y, z)),
                None => warn(line_no + 1),
            },
            Some("s") => match parts.next() {
                Some("1") | Some("on") => out.smooth = true,
                Some("0") | Some("off") => out.smooth = false,
                _ => warn(line_no + 1),
            },
            Some("f") => {
                let refs: Option<Vec<FaceRef>> = parts.map(parse_face_ref).collect();
                match refs {
                    Some(refs) if refs.len() >= 3 => {
                        emit_fan(&refs, &positions, &uvs, &normals, &mut out.triangles)
                    }
                    _ => warn(line_no + 1),
                }
            }
            _ => {}
        }
    }

    out
}

/// Fan-triangulates a face: corners `(0, i, i+1)` for `i = 1..n-1`.
fn emit_fan(
    refs: &[FaceRef],
    positions: &[Vector3],
    uvs: &[Vector2],
    normals: &[Vector3],
    out: &mut Vec<Triangle>,
) {
    let corner = |a: FaceRef, b: FaceRef, c: FaceRef| -> Option<Triangle> {
        let fan = [a, b, c];
        let mut vertices = [Vertex::default(); 3];
        for (vertex, r) in vertices.iter_mut().zip(fan) {
            vertex.position = *positions.get(r.position)?;
        }
        // UVs and normals only apply when every corner of the triangle
        // carries a valid index; partial attribution falls back to defaults.
        if let (Some(a), Some(b), Some(c)) = (
            fan[0].uv.and_then(|i| uvs.get(i)),
            fan[1].uv.and_then(|i| uvs.get(i)),
            fan[2].uv.and_then(|i| uvs.get(i)),
        ) {
            vertices[0].uv = *a;
            vertices[1].uv = *b;
            vertices[2].uv = *c;
        }
        if let (Some(a), Some(b), Some(c)) = (
            fan[0].normal.and_then(|i| normals.get(i)),
            fan[1].normal.and_then(|i| normals.get(i)),
            fan[2].normal.and_then(|i| normals.get(i)),
        ) {
            vertices[0].normal = *a;
            vertices[1].normal = *b;
            vertices[2].normal = *c;
        }
        Some(Triangle {
            a: vertices[0],
            b: vertices[1],
            c: vertices[2],
        })
    };

    for i in 1..refs.len() - 1 {
        if let Some(tri) = corner(refs[0], refs[i], refs[i + 1]) {
            out.push(tri);
        }
    }
}

/// Replaces every vertex normal with the average of the face normals meeting
/// at that position.
///
/// Corner positions are bucketed with a per-component tolerance of `1e-6`;
/// each bucket accumulates the normalized face normals of its triangles, and
/// the renormalized average is written back to every corner in the bucket.
pub fn average_normals(triangles: &mut [Triangle]) {
    const TOLERANCE: f32 = 1e-6;

    let mut unique: Vec<Vector3> = Vec::new();
    let mut bucket_of = Vec::with_capacity(triangles.len() * 3);
    for tri in triangles.iter() {
        for corner in tri.corners() {
            let p = corner.position;
            let found = unique.iter().position(|&q| {
                libm::fabsf(q.x - p.x) < TOLERANCE
                    && libm::fabsf(q.y - p.y) < TOLERANCE
                    && libm::fabsf(q.z - p.z) < TOLERANCE
            });
            bucket_of.push(found.unwrap_or_else(|| {
                unique.push(p);
                unique.len() - 1
            }));
        }
    }

    let mut sums = vec![Vector3::zeros(); unique.len()];
    let mut counts = vec![0u32; unique.len()];
    for (i, tri) in triangles.iter().enumerate() {
        let u = tri.b.position - tri.a.position;
        let v = tri.c.position - tri.a.position;
        let face_normal = crate::scene::normalize_or_zero(u.cross(&v));
        for corner in 0..3 {
            let bucket = bucket_of[i * 3 + corner];
            sums[bucket] += face_normal;
            counts[bucket] += 1;
        }
    }

    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            *sum = crate::scene::normalize_or_zero(*sum / count as f32);
        }
    }

    for (i, tri) in triangles.iter_mut().enumerate() {
        let corners = tri.corners_mut();
        for (corner, vertex) in corners.into_iter().enumerate() {
            vertex.normal = sums[bucket_of[i * 3 + corner]];
        }
    }
}

/// Parses MTL text, resolving texture paths through `textures` relative to
/// `base` when they are not absolute. Returns the materials in file order.
pub fn parse_mtl(text: &str, base: &Path, textures: &mut dyn TextureSource) -> Vec<Material> {
    let mut materials: Vec<Material> = Vec::new();
    let mut warned = false;
    let mut warn = |line_no: usize| {
        if !warned {
            tracing::warn!(line = line_no, "skipping malformed MTL line");
            warned = true;
        }
    };

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let directive = parts.next().unwrap_or("");

        if directive == "newmtl" {
            materials.push(Material::default());
            continue;
        }
        let Some(current) = materials.last_mut() else {
            continue;
        };

        match directive {
            "Ka" => match parse_floats::<3>(&mut parts) {
                Some([r, g, b]) => current.ambient = Vector3::new(r, g, b),
                None => warn(line_no + 1),
            },
            "Kd" => match parse_floats::<3>(&mut parts) {
                Some([r, g, b]) => current.diffuse = Vector3::new(r, g, b),
                None => warn(line_no + 1),
            },
            "Ks" => match parse_floats::<3>(&mut parts) {
                Some([r, g, b]) => current.specular = Vector3::new(r, g, b),
                None => warn(line_no + 1),
            },
            "Ns" => match parse_floats::<1>(&mut parts) {
                Some([v]) => current.shininess = v,
                None => warn(line_no + 1),
            },
            "d" => match parse_floats::<1>(&mut parts) {
                Some([v]) => current.transparency = v,
                None => warn(line_no + 1),
            },
            "map_Kd" => current.diffuse_tex = decode_map(&mut parts, base, textures),
            "map_Ks" => current.specular_tex = decode_map(&mut parts, base, textures),
            "map_Bump" | "map_bump" => current.normal_tex = decode_map(&mut parts, base, textures),
            _ => {}
        }
    }

    materials
}

fn decode_map(
    parts: &mut core::str::SplitWhitespace<'_>,
    base: &Path,
    textures: &mut dyn TextureSource,
) -> Option<Texture> {
    let raw = Path::new(parts.next()?);
    let path = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base.join(raw)
    };
    match textures.decode(&path) {
        Ok(img) => Some(Texture::from_rgb8(img.width, img.height, &img.data)),
        Err(err) => {
            tracing::warn!(%err, "texture decode failed, sampling as white");
            None
        }
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Loads the mesh a model folder describes.
///
/// Scans `dir` for an OBJ, an MTL, and loose `.png`/`.jpg` images. The OBJ is
/// required; everything else degrades: a missing MTL yields a default
/// material with a white diffuse, a missing diffuse texture falls back to a
/// loose image from the folder, and failing that to the checkerboard
/// placeholder. Extra OBJ or MTL files warn and the last one seen wins.
pub fn load_mesh(
    dir: &Path,
    textures: &mut dyn TextureSource,
    options: &LoadOptions,
) -> Result<Mesh, LoadError> {
    let mut obj_path = None;
    let mut obj_seen = 0usize;
    let mut mtl_path = None;
    let mut mtl_seen = 0usize;
    let mut image_path = None;

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if has_extension(name, "obj") {
            obj_seen += 1;
            obj_path = Some(path);
        } else if has_extension(name, "mtl") {
            mtl_seen += 1;
            mtl_path = Some(path);
        } else if has_extension(name, "png") || has_extension(name, "jpg") {
            image_path = Some(path);
        }
    }

    let obj_path = obj_path.ok_or_else(|| LoadError::NoObj {
        dir: dir.to_path_buf(),
    })?;
    if obj_seen > 1 {
        tracing::warn!(dir = %dir.display(), using = %obj_path.display(), "multiple .obj files, using the last seen");
    }
    if mtl_seen > 1 {
        tracing::warn!(dir = %dir.display(), "multiple .mtl files, using the last seen");
    }

    let mut obj = parse_obj(&fs::read_to_string(&obj_path)?);
    if obj.smooth || options.force_smooth {
        average_normals(&mut obj.triangles);
    }

    let fallback_tex = match image_path {
        Some(path) => match textures.decode(&path) {
            Ok(img) => Texture::from_rgb8(img.width, img.height, &img.data),
            Err(err) => {
                tracing::warn!(%err, "folder image decode failed, using placeholder");
                Texture::checkerboard()
            }
        },
        None => Texture::checkerboard(),
    };

    let parsed = match &mtl_path {
        Some(path) => parse_mtl(&fs::read_to_string(path)?, dir, textures)
            .into_iter()
            .next(),
        None => None,
    };
    // An MTL that declares no materials counts as absent: white diffuse, not
    // the per-material default.
    let mut material = parsed.unwrap_or(Material {
        diffuse: Vector3::new(1.0, 1.0, 1.0),
        ..Material::default()
    });
    if material.diffuse_tex.is_none() {
        material.diffuse_tex = Some(fallback_tex);
    }

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Mesh::new(name, obj.triangles, material))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoTextures;
    impl TextureSource for NoTextures {
        fn decode(&mut self, path: &Path) -> Result<RgbImage, TextureError> {
            Err(TextureError {
                path: path.to_path_buf(),
                reason: "unavailable".into(),
            })
        }
    }

    struct SolidRed;
    impl TextureSource for SolidRed {
        fn decode(&mut self, _: &Path) -> Result<RgbImage, TextureError> {
            Ok(RgbImage {
                width: 2,
                height: 2,
                data: [255, 0, 0].repeat(4),
            })
        }
    }

    const QUAD_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_fan_triangulates() {
        let obj = parse_obj(QUAD_OBJ);
        assert_eq!(obj.triangles.len(), 2);
        let second = &obj.triangles[1];
        assert_eq!(second.a.position, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(second.b.position, Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(second.c.position, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(second.c.uv, Vector2::new(0.0, 1.0));
        assert_eq!(second.c.normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn face_forms_resolve_optional_indices() {
        let obj = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n",
        );
        assert_eq!(obj.triangles.len(), 1);
        let tri = &obj.triangles[0];
        assert_eq!(tri.a.uv, Vector2::zeros());
        assert_eq!(tri.a.normal, Vector3::new(0.0, 0.0, 1.0));

        let bare = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert_eq!(bare.triangles[0].b.normal, Vector3::zeros());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let obj = parse_obj("v 0 0 0\nv oops\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 1 99 3\n");
        // The bad vertex line and the out-of-range face are dropped.
        assert_eq!(obj.triangles.len(), 1);
    }

    #[test]
    fn smooth_flag_parses_both_spellings() {
        assert!(parse_obj("s on\n").smooth);
        assert!(parse_obj("s 1\n").smooth);
        assert!(!parse_obj("s 1\ns off\n").smooth);
        assert!(!parse_obj("s 1\ns 0\n").smooth);
    }

    #[test]
    fn averaged_normals_are_unit_and_shared() {
        // Two faces of an open "tent" sharing the ridge edge.
        let mut obj = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\ns on\nf 1 2 3\nf 1 4 2\n",
        );
        average_normals(&mut obj.triangles);
        for tri in &obj.triangles {
            for corner in tri.corners() {
                assert!((corner.normal.norm() - 1.0).abs() < 1e-5);
            }
        }
        // Shared positions carry identical normals.
        assert_eq!(obj.triangles[0].a.normal, obj.triangles[1].a.normal);
        assert_eq!(obj.triangles[0].b.normal, obj.triangles[1].c.normal);
    }

    #[test]
    fn averaging_twice_is_idempotent() {
        let mut obj = parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nf 1 4 2\n",
        );
        average_normals(&mut obj.triangles);
        let first: Vec<_> = obj
            .triangles
            .iter()
            .flat_map(|t| t.corners().map(|c| c.normal))
            .collect();
        average_normals(&mut obj.triangles);
        let second: Vec<_> = obj
            .triangles
            .iter()
            .flat_map(|t| t.corners().map(|c| c.normal))
            .collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).norm() < 1e-5);
        }
    }

    #[test]
    fn mtl_parses_multiple_materials() {
        let text = "\
newmtl painted
Ka 0.1 0.1 0.1
Kd 1 0 0
Ks 0.5 0.5 0.5
Ns 64
d 0.75
newmtl bare
Kd 0 1 0
";
        let materials = parse_mtl(text, Path::new("."), &mut NoTextures);
        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0].diffuse, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(materials[0].shininess, 64.0);
        assert_eq!(materials[0].transparency, 0.75);
        assert_eq!(materials[1].diffuse, Vector3::new(0.0, 1.0, 0.0));
        // Unset fields keep their defaults.
        assert_eq!(materials[1].shininess, 32.0);
    }

    #[test]
    fn mtl_without_materials_falls_back_to_white_diffuse() {
        let dir = std::env::temp_dir().join(format!("blockrend-bare-mtl-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("model.obj"), QUAD_OBJ).unwrap();
        fs::write(dir.join("model.mtl"), "# no newmtl declared\n").unwrap();

        let mesh = load_mesh(&dir, &mut NoTextures, &LoadOptions::default()).unwrap();
        assert_eq!(mesh.material.diffuse, Vector3::new(1.0, 1.0, 1.0));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mtl_texture_failure_samples_white() {
        let materials = parse_mtl(
            "newmtl m\nmap_Kd missing.png\n",
            Path::new("."),
            &mut NoTextures,
        );
        assert!(materials[0].diffuse_tex.is_none());
    }

    #[test]
    fn mtl_texture_decode_resolves_relative_to_base() {
        let materials = parse_mtl(
            "newmtl m\nmap_Kd tex.png\n",
            Path::new("/models/crate"),
            &mut SolidRed,
        );
        let tex = materials[0].diffuse_tex.as_ref().unwrap();
        assert_eq!(tex.sample(0.5, 0.5), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn folder_loading_pairs_obj_and_mtl() {
        let dir = std::env::temp_dir().join(format!("blockrend-obj-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("model.obj"), QUAD_OBJ).unwrap();
        fs::write(dir.join("model.mtl"), "newmtl m\nKd 0 0 1\n").unwrap();

        let mesh = load_mesh(&dir, &mut NoTextures, &LoadOptions::default()).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.material.diffuse, Vector3::new(0.0, 0.0, 1.0));
        // No map_Kd and no loose image: the placeholder checkerboard fills in.
        assert!(mesh.material.diffuse_tex.is_some());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn folder_without_obj_fails() {
        let dir = std::env::temp_dir().join(format!("blockrend-empty-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let err = load_mesh(&dir, &mut NoTextures, &LoadOptions::default());
        assert!(matches!(err, Err(LoadError::NoObj { .. })));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn force_smooth_overrides_flat_obj() {
        let dir = std::env::temp_dir().join(format!("blockrend-smooth-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("flat.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let flat = load_mesh(&dir, &mut NoTextures, &LoadOptions::default()).unwrap();
        assert_eq!(flat.triangles[0].a.normal, Vector3::zeros());

        let smooth = load_mesh(
            &dir,
            &mut NoTextures,
            &LoadOptions { force_smooth: true },
        )
        .unwrap();
        assert!((smooth.triangles[0].a.normal.norm() - 1.0).abs() < 1e-5);

        fs::remove_dir_all(&dir).unwrap();
    }
}
