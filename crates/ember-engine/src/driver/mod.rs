//! Graphics driver abstraction.
//!
//! `Driver` covers the slice of the OpenGL core API the pipeline uses. Higher
//! layers never talk to GL directly; they go through `device::Gpu`, which
//! wraps every call with the diagnostics layer.
//!
//! Backends:
//! - `GlowDriver`: real contexts via `glow` (native targets only)
//! - `RecordingDriver`: in-memory model used for headless runs and tests

#[cfg(not(target_arch = "wasm32"))]
mod glow_backend;
mod recording;
mod types;

#[cfg(not(target_arch = "wasm32"))]
pub use glow_backend::GlowDriver;
pub use recording::{AttribRecord, DrawRecord, ObjectKind, RecordingDriver, UniformValue};
pub use types::{
    BufferId, BufferTarget, BufferUsage, Capability, ClearMask, ComponentType, PixelFormat,
    PrimitiveMode, ProgramId, SamplerParams, ShaderId, StageKind, TextureId, UniformLocation,
    VertexArrayId, error_code,
};

/// Driver entry points used by the pipeline.
///
/// Object creation reports failure as a driver message; every other call is
/// fire-and-forget and signals problems through the error queue (`get_error`).
/// Implementations must be used from the thread that owns the context.
pub trait Driver {
    /// Pops one code from the error queue; `error_code::NO_ERROR` when empty.
    fn get_error(&mut self) -> u32;

    /// Human-readable driver/version string, for logging.
    fn version(&mut self) -> String;

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&mut self, kind: StageKind) -> Result<ShaderId, String>;
    fn shader_source(&mut self, shader: ShaderId, source: &str);
    fn compile_shader(&mut self, shader: ShaderId);
    fn compile_status(&mut self, shader: ShaderId) -> bool;
    fn shader_info_log(&mut self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> Result<ProgramId, String>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn link_program(&mut self, program: ProgramId);
    fn link_status(&mut self, program: ProgramId) -> bool;
    fn validate_program(&mut self, program: ProgramId);
    fn validate_status(&mut self, program: ProgramId) -> bool;
    fn program_info_log(&mut self, program: ProgramId) -> String;
    fn use_program(&mut self, program: Option<ProgramId>);
    fn delete_program(&mut self, program: ProgramId);

    // ── uniforms ──────────────────────────────────────────────────────────

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_mat4(&mut self, location: UniformLocation, columns: &[f32; 16]);
    fn uniform_i32(&mut self, location: UniformLocation, value: i32);
    fn uniform_f32(&mut self, location: UniformLocation, value: f32);

    // ── buffers & vertex arrays ───────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<BufferId, String>;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, String>;
    fn bind_vertex_array(&mut self, vao: Option<VertexArrayId>);
    fn delete_vertex_array(&mut self, vao: VertexArrayId);

    /// Float (or normalized integer) attribute pointer into the bound array buffer.
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: u32,
        ty: ComponentType,
        normalized: bool,
        stride: u32,
        offset: u32,
    );

    /// Pure integer attribute pointer (`glVertexAttribIPointer`).
    fn vertex_attrib_pointer_int(
        &mut self,
        location: u32,
        components: u32,
        ty: ComponentType,
        stride: u32,
        offset: u32,
    );

    fn enable_vertex_attrib_array(&mut self, location: u32);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<TextureId, String>;
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, texture: Option<TextureId>);
    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]);
    fn tex_parameters(&mut self, params: SamplerParams);
    fn generate_mipmap(&mut self);
    fn delete_texture(&mut self, texture: TextureId);

    // ── frame state & drawing ─────────────────────────────────────────────

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, mask: ClearMask);
    fn set_capability(&mut self, cap: Capability, enabled: bool);

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32);

    /// Indexed draw reading `count` unsigned 32-bit indices from the bound
    /// element buffer, starting at byte `offset`.
    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32, offset: u32);
}
