//! Per-frame rendering.
//!
//! `FrameRenderer` owns one shader program, the meshes it draws and an
//! optional texture. Each frame it clears, recomputes `FrameState` from the
//! elapsed time, uploads the transforms and issues one draw call per mesh.
//! What differs between scenes lives in `RendererConfig`.

mod config;
mod renderer;
mod state;

pub use config::{RendererConfig, UniformNames};
pub use renderer::{FrameRenderer, FrameRendererBuilder, RunSummary};
pub use state::{Camera, FrameState, Projection, TransformConfig};
