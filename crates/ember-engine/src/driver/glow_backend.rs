use glow::HasContext;

use super::{
    BufferId, BufferTarget, BufferUsage, Capability, ClearMask, ComponentType, Driver, PixelFormat,
    PrimitiveMode, ProgramId, SamplerParams, ShaderId, StageKind, TextureId, UniformLocation,
    VertexArrayId,
};

/// `Driver` backed by a `glow` OpenGL context.
///
/// Every method issues raw GL calls against the wrapped context. The safety
/// contract is taken once, at construction: the context must stay current on
/// the calling thread for as long as this value is used.
pub struct GlowDriver {
    gl: glow::Context,
}

impl GlowDriver {
    /// Wraps a loaded `glow` context.
    ///
    /// # Safety
    ///
    /// The GL context `gl` was loaded from must be current on this thread
    /// whenever a `Driver` method is called, and must outlive this value.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Borrows the underlying context for calls outside the `Driver` surface.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn stage_enum(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => glow::VERTEX_SHADER,
        StageKind::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn target_enum(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn usage_enum(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Stream => glow::STREAM_DRAW,
    }
}

fn component_enum(ty: ComponentType) -> u32 {
    match ty {
        ComponentType::F32 => glow::FLOAT,
        ComponentType::I32 => glow::INT,
        ComponentType::U32 => glow::UNSIGNED_INT,
        ComponentType::I16 => glow::SHORT,
        ComponentType::U16 => glow::UNSIGNED_SHORT,
        ComponentType::I8 => glow::BYTE,
        ComponentType::U8 => glow::UNSIGNED_BYTE,
    }
}

fn mode_enum(mode: PrimitiveMode) -> u32 {
    match mode {
        PrimitiveMode::Triangles => glow::TRIANGLES,
        PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveMode::Lines => glow::LINES,
        PrimitiveMode::Points => glow::POINTS,
    }
}

fn capability_enum(cap: Capability) -> u32 {
    match cap {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::Blend => glow::BLEND,
        Capability::CullFace => glow::CULL_FACE,
    }
}

fn pixel_enums(format: PixelFormat) -> (i32, u32) {
    match format {
        PixelFormat::R8 => (glow::R8 as i32, glow::RED),
        PixelFormat::Rg8 => (glow::RG8 as i32, glow::RG),
        PixelFormat::Rgb8 => (glow::RGB8 as i32, glow::RGB),
        PixelFormat::Rgba8 => (glow::RGBA8 as i32, glow::RGBA),
    }
}

impl Driver for GlowDriver {
    fn get_error(&mut self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn version(&mut self) -> String {
        unsafe { self.gl.get_parameter_string(glow::VERSION) }
    }

    fn create_shader(&mut self, kind: StageKind) -> Result<ShaderId, String> {
        let shader = unsafe { self.gl.create_shader(stage_enum(kind))? };
        Ok(ShaderId(shader.0))
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        unsafe { self.gl.shader_source(glow::NativeShader(shader.0), source) }
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        unsafe { self.gl.compile_shader(glow::NativeShader(shader.0)) }
    }

    fn compile_status(&mut self, shader: ShaderId) -> bool {
        unsafe { self.gl.get_shader_compile_status(glow::NativeShader(shader.0)) }
    }

    fn shader_info_log(&mut self, shader: ShaderId) -> String {
        unsafe { self.gl.get_shader_info_log(glow::NativeShader(shader.0)) }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        unsafe { self.gl.delete_shader(glow::NativeShader(shader.0)) }
    }

    fn create_program(&mut self) -> Result<ProgramId, String> {
        let program = unsafe { self.gl.create_program()? };
        Ok(ProgramId(program.0))
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        unsafe {
            self.gl
                .attach_shader(glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        unsafe {
            self.gl
                .detach_shader(glow::NativeProgram(program.0), glow::NativeShader(shader.0))
        }
    }

    fn link_program(&mut self, program: ProgramId) {
        unsafe { self.gl.link_program(glow::NativeProgram(program.0)) }
    }

    fn link_status(&mut self, program: ProgramId) -> bool {
        unsafe { self.gl.get_program_link_status(glow::NativeProgram(program.0)) }
    }

    fn validate_program(&mut self, program: ProgramId) {
        unsafe { self.gl.validate_program(glow::NativeProgram(program.0)) }
    }

    fn validate_status(&mut self, program: ProgramId) -> bool {
        unsafe { self.gl.get_program_validate_status(glow::NativeProgram(program.0)) }
    }

    fn program_info_log(&mut self, program: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(glow::NativeProgram(program.0)) }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.map(|p| glow::NativeProgram(p.0))) }
    }

    fn delete_program(&mut self, program: ProgramId) {
        unsafe { self.gl.delete_program(glow::NativeProgram(program.0)) }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(glow::NativeProgram(program.0), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn uniform_mat4(&mut self, location: UniformLocation, columns: &[f32; 16]) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&loc), false, columns) }
    }

    fn uniform_i32(&mut self, location: UniformLocation, value: i32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_i32(Some(&loc), value) }
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_f32(Some(&loc), value) }
    }

    fn create_buffer(&mut self) -> Result<BufferId, String> {
        let buffer = unsafe { self.gl.create_buffer()? };
        Ok(BufferId(buffer.0))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        unsafe {
            self.gl
                .bind_buffer(target_enum(target), buffer.map(|b| glow::NativeBuffer(b.0)))
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(target_enum(target), data, usage_enum(usage))
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer.0)) }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, String> {
        let vao = unsafe { self.gl.create_vertex_array()? };
        Ok(VertexArrayId(vao.0))
    }

    fn bind_vertex_array(&mut self, vao: Option<VertexArrayId>) {
        unsafe {
            self.gl
                .bind_vertex_array(vao.map(|v| glow::NativeVertexArray(v.0)))
        }
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) {
        unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(vao.0)) }
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: u32,
        ty: ComponentType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                location,
                components as i32,
                component_enum(ty),
                normalized,
                stride as i32,
                offset as i32,
            )
        }
    }

    fn vertex_attrib_pointer_int(
        &mut self,
        location: u32,
        components: u32,
        ty: ComponentType,
        stride: u32,
        offset: u32,
    ) {
        unsafe {
            self.gl.vertex_attrib_pointer_i32(
                location,
                components as i32,
                component_enum(ty),
                stride as i32,
                offset as i32,
            )
        }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn create_texture(&mut self) -> Result<TextureId, String> {
        let texture = unsafe { self.gl.create_texture()? };
        Ok(TextureId(texture.0))
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.map(|t| glow::NativeTexture(t.0)))
        }
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        let (internal, external) = pixel_enums(format);
        unsafe {
            // Decoded images are tightly packed; RGB rows are not 4-byte aligned.
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width as i32,
                height as i32,
                0,
                external,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn tex_parameters(&mut self, params: SamplerParams) {
        let mag = if params.linear {
            glow::LINEAR
        } else {
            glow::NEAREST
        };
        let min = match (params.linear, params.mipmaps) {
            (true, true) => glow::LINEAR_MIPMAP_LINEAR,
            (false, true) => glow::NEAREST_MIPMAP_NEAREST,
            (true, false) => glow::LINEAR,
            (false, false) => glow::NEAREST,
        };
        let wrap = if params.clamp_to_edge {
            glow::CLAMP_TO_EDGE
        } else {
            glow::REPEAT
        };
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap as i32);
        }
    }

    fn generate_mipmap(&mut self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture.0)) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) }
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&mut self, mask: ClearMask) {
        let mut bits = 0;
        if mask.color {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.depth {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) }
    }

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability_enum(cap));
            } else {
                self.gl.disable(capability_enum(cap));
            }
        }
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) {
        unsafe { self.gl.draw_arrays(mode_enum(mode), first as i32, count as i32) }
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32, offset: u32) {
        unsafe {
            self.gl.draw_elements(
                mode_enum(mode),
                count as i32,
                glow::UNSIGNED_INT,
                offset as i32,
            )
        }
    }
}
