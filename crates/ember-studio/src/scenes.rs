//! Demo scene presets.
//!
//! Each preset is a renderer configuration, a shader pair from `res/` and
//! one mesh. They all run through the same `FrameRenderer`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use bytemuck::{Pod, Zeroable};
use ember_engine::device::Gpu;
use ember_engine::driver::{Driver, StageKind};
use ember_engine::frame::{Camera, FrameRenderer, Projection, RendererConfig, TransformConfig};
use ember_engine::geometry::{Mesh, VertexAttribute};
use ember_engine::shader::{ShaderSource, build_program};
use ember_engine::texture::{DecodedImage, Texture2d};
use glam::Vec3;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SceneKind {
    #[default]
    Quad,
    Cube,
    Textured,
}

impl SceneKind {
    pub const ALL: [SceneKind; 3] = [SceneKind::Quad, SceneKind::Cube, SceneKind::Textured];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Quad => "quad",
            SceneKind::Cube => "cube",
            SceneKind::Textured => "textured",
        }
    }

    fn config(self) -> RendererConfig {
        match self {
            SceneKind::Quad => RendererConfig::default().clear_color([0.2, 0.3, 0.3, 1.0]),
            SceneKind::Cube => RendererConfig::default()
                .clear_color([0.08, 0.08, 0.1, 1.0])
                .depth_test(true)
                .transform(
                    TransformConfig::default()
                        .rotation(Vec3::new(0.5, 1.0, 0.0), 0.9)
                        .camera(Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO))
                        .projection(Projection::Perspective {
                            fov_y_radians: 45f32.to_radians(),
                            near: 0.1,
                            far: 100.0,
                        }),
                ),
            SceneKind::Textured => RendererConfig::default()
                .clear_color([0.15, 0.15, 0.18, 1.0])
                .transform(TransformConfig::default().rotation(Vec3::Z, 0.25))
                .texture_unit(0),
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match SceneKind::ALL.into_iter().find(|kind| kind.name() == s) {
            Some(kind) => Ok(kind),
            None => bail!("unknown scene `{s}` (expected one of: quad, cube, textured)"),
        }
    }
}

// ── vertex formats ────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PlainVertex {
    pos: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ColorVertex {
    pos: [f32; 3],
    color: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TexVertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

const QUAD: [PlainVertex; 4] = [
    PlainVertex { pos: [-0.5, -0.5] },
    PlainVertex { pos: [0.5, -0.5] },
    PlainVertex { pos: [0.5, 0.5] },
    PlainVertex { pos: [-0.5, 0.5] },
];

const fn tex_vertex(pos: [f32; 2], uv: [f32; 2]) -> TexVertex {
    TexVertex { pos, uv }
}

const TEXTURED_QUAD: [TexVertex; 4] = [
    tex_vertex([-0.6, -0.6], [0.0, 0.0]),
    tex_vertex([0.6, -0.6], [1.0, 0.0]),
    tex_vertex([0.6, 0.6], [1.0, 1.0]),
    tex_vertex([-0.6, 0.6], [0.0, 1.0]),
];

/// Unit cube as 12 triangles, one flat color per face.
fn cube_vertices() -> Vec<ColorVertex> {
    // (normal axis, sign, color)
    let faces: [(usize, f32, [f32; 3]); 6] = [
        (0, 1.0, [0.9, 0.3, 0.3]),
        (0, -1.0, [0.3, 0.9, 0.3]),
        (1, 1.0, [0.3, 0.3, 0.9]),
        (1, -1.0, [0.9, 0.9, 0.3]),
        (2, 1.0, [0.3, 0.9, 0.9]),
        (2, -1.0, [0.9, 0.3, 0.9]),
    ];
    let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

    let mut vertices = Vec::with_capacity(36);
    for (axis, sign, color) in faces {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        let quad: Vec<ColorVertex> = corners
            .iter()
            .map(|&(a, b)| {
                let mut pos = [0.0; 3];
                pos[axis] = 0.5 * sign;
                pos[u] = a * sign;
                pos[v] = b;
                ColorVertex { pos, color }
            })
            .collect();
        vertices.extend(QUAD_INDICES.iter().map(|&i| quad[i as usize]));
    }
    vertices
}

// ── assembly ──────────────────────────────────────────────────────────────

fn shader_dir(kind: SceneKind) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("res").join(kind.name())
}

fn load_image(path: Option<&Path>) -> Result<DecodedImage> {
    let Some(path) = path else {
        log::info!("no image given; using a generated checkerboard");
        let light = [235, 235, 235, 255];
        let dark = [40, 40, 48, 255];
        return Ok(DecodedImage::checkerboard(8, 32, light, dark)?);
    };

    // GL reads rows bottom-up.
    let rgba = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .flipv()
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    log::info!("loaded {} ({width}x{height})", path.display());
    Ok(DecodedImage::new(width, height, 4, rgba.into_raw()))
}

/// Builds the renderer for `kind`. `image` is only used by the textured scene.
pub fn build<D: Driver>(
    gpu: &mut Gpu<D>,
    kind: SceneKind,
    image: Option<&Path>,
) -> Result<FrameRenderer> {
    let config = kind.config();
    let dir = shader_dir(kind);
    let vertex = ShaderSource::load(StageKind::Vertex, dir.join("vertex.shader"));
    let fragment = ShaderSource::load(StageKind::Fragment, dir.join("fragment.shader"));

    let program = build_program(gpu, &vertex, &fragment)
        .with_context(|| format!("failed to build the {kind} shader program"))?;

    let mesh = match kind {
        SceneKind::Quad => Mesh::from_vertices(
            gpu,
            &QUAD,
            &[VertexAttribute::f32(0, 2)],
            Some(&QUAD_INDICES[..]),
        ),
        SceneKind::Cube => Mesh::from_vertices(
            gpu,
            &cube_vertices(),
            &[VertexAttribute::f32(0, 3), VertexAttribute::f32(1, 3)],
            None,
        ),
        SceneKind::Textured => Mesh::from_vertices(
            gpu,
            &TEXTURED_QUAD,
            &[VertexAttribute::f32(0, 2), VertexAttribute::f32(1, 2)],
            Some(&QUAD_INDICES[..]),
        ),
    };
    let mesh = match mesh {
        Ok(mesh) => mesh,
        Err(err) => {
            let _ = program.release(gpu);
            return Err(err).context("failed to upload scene geometry");
        }
    };

    let mut builder = FrameRenderer::builder(config.clone()).program(program).mesh(mesh);

    if kind == SceneKind::Textured {
        let texture = load_image(image)
            .and_then(|img| Ok(Texture2d::upload(gpu, &img, config.texture_unit)?));
        match texture {
            Ok(texture) => builder = builder.texture(texture),
            Err(err) => {
                let _ = builder.release(gpu);
                return Err(err.context("failed to prepare the scene texture"));
            }
        }
    } else if image.is_some() {
        log::warn!("the {kind} scene does not use an image; ignoring it");
    }

    Ok(builder.build(gpu)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_engine::diagnostics::{Diagnostics, ErrorPolicy};
    use ember_engine::driver::{ObjectKind, RecordingDriver};

    #[test]
    fn scene_names_round_trip() {
        for kind in SceneKind::ALL {
            assert_eq!(kind.name().parse::<SceneKind>().unwrap(), kind);
        }
        assert!("sphere".parse::<SceneKind>().is_err());
    }

    #[test]
    fn cube_has_thirty_six_vertices_on_the_unit_cube() {
        let vertices = cube_vertices();
        assert_eq!(vertices.len(), 36);
        assert!(vertices.iter().all(|v| v.pos.iter().all(|c| c.abs() == 0.5)));
    }

    #[test]
    fn every_scene_builds_against_the_recording_driver() {
        for kind in SceneKind::ALL {
            let diagnostics = Diagnostics::new(ErrorPolicy::AbortOnError);
            let mut gpu = Gpu::new(RecordingDriver::new(), diagnostics);
            let renderer = build(&mut gpu, kind, None).unwrap();
            assert_eq!(renderer.meshes().len(), 1);
            renderer.release(&mut gpu).unwrap();
            assert_eq!(gpu.driver().live_count(ObjectKind::Buffer), 0);
            assert_eq!(gpu.driver().live_count(ObjectKind::Program), 0);
        }
    }
}
