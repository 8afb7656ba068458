use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::num::NonZeroU32;

use super::error_code::{INVALID_OPERATION, INVALID_VALUE};
use super::{
    BufferId, BufferTarget, BufferUsage, Capability, ClearMask, ComponentType, Driver, PixelFormat,
    PrimitiveMode, ProgramId, SamplerParams, ShaderId, StageKind, TextureId, UniformLocation,
    VertexArrayId,
};

/// Object categories tracked for handle accounting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    Shader,
    Program,
    Buffer,
    VertexArray,
    Texture,
}

/// A draw call accepted by the recording driver.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawRecord {
    Arrays {
        mode: PrimitiveMode,
        first: u32,
        count: u32,
        program: ProgramId,
        vao: VertexArrayId,
    },
    Elements {
        mode: PrimitiveMode,
        count: u32,
        offset: u32,
        program: ProgramId,
        vao: VertexArrayId,
        element_buffer: BufferId,
    },
}

impl DrawRecord {
    /// Number of vertices or indices the call requested.
    pub fn count(&self) -> u32 {
        match self {
            DrawRecord::Arrays { count, .. } | DrawRecord::Elements { count, .. } => *count,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, DrawRecord::Elements { .. })
    }
}

/// Last value uploaded to a uniform location.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Mat4([f32; 16]),
    I32(i32),
    F32(f32),
}

/// One recorded attribute pointer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttribRecord {
    pub location: u32,
    pub components: u32,
    pub ty: ComponentType,
    pub normalized: bool,
    pub integer: bool,
    pub stride: u32,
    pub offset: u32,
    pub buffer: BufferId,
}

#[derive(Debug)]
struct ShaderObject {
    kind: StageKind,
    source: String,
    compiled: bool,
    log: String,
    delete_pending: bool,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    linked: bool,
    validated: bool,
    log: String,
    uniforms: Vec<String>,
    values: HashMap<u32, UniformValue>,
}

#[derive(Debug, Default)]
struct VertexArrayObject {
    element_buffer: Option<BufferId>,
    attribs: BTreeMap<u32, AttribRecord>,
    enabled: HashSet<u32>,
}

#[derive(Debug, Default)]
struct BufferObject {
    len: usize,
    usage: Option<BufferUsage>,
}

#[derive(Debug, Default)]
struct TextureObject {
    width: u32,
    height: u32,
    format: Option<PixelFormat>,
    params: Option<SamplerParams>,
    mipmapped: bool,
}

/// In-memory `Driver` that models GL object lifetimes and error reporting.
///
/// The model follows core-profile rules closely enough for pipeline code to be
/// exercised without a GPU: invalid handles and missing bindings push error
/// codes onto the queue, accepted draw calls are recorded, and per-kind object
/// counts allow leak and double-free checks.
///
/// Shader "compilation" is a light syntax check: the source must declare
/// `void main`, keep braces/parentheses balanced and contain no `#error`.
/// `uniform` declarations receive locations in declaration order.
#[derive(Debug)]
pub struct RecordingDriver {
    next_name: u32,

    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    buffers: HashMap<BufferId, BufferObject>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayObject>,
    textures: HashMap<TextureId, TextureObject>,

    created: HashMap<ObjectKind, usize>,
    deleted: HashMap<ObjectKind, usize>,

    errors: VecDeque<u32>,
    calls: Vec<&'static str>,
    draws: Vec<DrawRecord>,
    clears: Vec<ClearMask>,
    uniform_lookups: usize,

    array_buffer: Option<BufferId>,
    vertex_array: Option<VertexArrayId>,
    program: Option<ProgramId>,
    active_unit: u32,
    unit_textures: HashMap<u32, TextureId>,
    capabilities: HashSet<Capability>,
    viewport: (i32, i32, u32, u32),
    clear_color: [f32; 4],

    forced_link_failure: Option<String>,
    forced_validation_failure: bool,
    scheduled_errors: Vec<(&'static str, u32)>,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self {
            next_name: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            created: HashMap::new(),
            deleted: HashMap::new(),
            errors: VecDeque::new(),
            calls: Vec::new(),
            draws: Vec::new(),
            clears: Vec::new(),
            uniform_lookups: 0,
            array_buffer: None,
            vertex_array: None,
            program: None,
            active_unit: 0,
            unit_textures: HashMap::new(),
            capabilities: HashSet::new(),
            viewport: (0, 0, 0, 0),
            clear_color: [0.0; 4],
            forced_link_failure: None,
            forced_validation_failure: false,
            scheduled_errors: Vec::new(),
        }
    }

    // ── test controls ─────────────────────────────────────────────────────

    /// Queues `code` as if the driver had raised it.
    pub fn inject_error(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    /// Raises `code` the next time `call` (e.g. `"glBufferData"`) is issued.
    pub fn fail_next(&mut self, call: &'static str, code: u32) {
        self.scheduled_errors.push((call, code));
    }

    /// Makes every subsequent link fail with `log`.
    pub fn force_link_failure(&mut self, log: impl Into<String>) {
        self.forced_link_failure = Some(log.into());
    }

    /// Makes every subsequent validation report failure.
    pub fn force_validation_failure(&mut self) {
        self.forced_validation_failure = true;
    }

    // ── inspection ────────────────────────────────────────────────────────

    /// Objects of `kind` that exist and are not flagged for deletion.
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Shader => self.shaders.values().filter(|s| !s.delete_pending).count(),
            ObjectKind::Program => self.programs.len(),
            ObjectKind::Buffer => self.buffers.len(),
            ObjectKind::VertexArray => self.vertex_arrays.len(),
            ObjectKind::Texture => self.textures.len(),
        }
    }

    pub fn created_count(&self, kind: ObjectKind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn deleted_count(&self, kind: ObjectKind) -> usize {
        self.deleted.get(&kind).copied().unwrap_or(0)
    }

    /// Names of the driver entry points called so far, in order.
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    /// Number of times `call` was issued.
    pub fn call_count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn clears(&self) -> &[ClearMask] {
        &self.clears
    }

    /// Uniform lookups that reached the driver.
    pub fn uniform_lookups(&self) -> usize {
        self.uniform_lookups
    }

    /// Errors still waiting in the queue.
    pub fn pending_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.vertex_array
    }

    pub fn capability_enabled(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn current_viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    pub fn current_clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn texture_on_unit(&self, unit: u32) -> Option<TextureId> {
        self.unit_textures.get(&unit).copied()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    pub fn buffer_len(&self, buffer: BufferId) -> Option<usize> {
        self.buffers.get(&buffer).map(|b| b.len)
    }

    pub fn buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&buffer).and_then(|b| b.usage)
    }

    /// Sampler state and mipmap presence of `texture`.
    pub fn texture_sampling(&self, texture: TextureId) -> Option<(SamplerParams, bool)> {
        let obj = self.textures.get(&texture)?;
        Some((obj.params?, obj.mipmapped))
    }

    /// Attribute pointers recorded on `vao`, ordered by location.
    pub fn attributes(&self, vao: VertexArrayId) -> Vec<AttribRecord> {
        self.vertex_arrays
            .get(&vao)
            .map(|v| v.attribs.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn attribute_enabled(&self, vao: VertexArrayId, location: u32) -> bool {
        self.vertex_arrays
            .get(&vao)
            .is_some_and(|v| v.enabled.contains(&location))
    }

    pub fn element_buffer(&self, vao: VertexArrayId) -> Option<BufferId> {
        self.vertex_arrays.get(&vao).and_then(|v| v.element_buffer)
    }

    /// Last value uploaded to uniform `name` of `program`.
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let obj = self.programs.get(&program)?;
        let index = obj.uniforms.iter().position(|u| u == name)?;
        obj.values.get(&(index as u32)).copied()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn record(&mut self, call: &'static str) {
        self.calls.push(call);
        if let Some(pos) = self.scheduled_errors.iter().position(|(c, _)| *c == call) {
            let (_, code) = self.scheduled_errors.remove(pos);
            self.raise(code);
        }
    }

    fn raise(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    fn allocate(&mut self, kind: ObjectKind) -> NonZeroU32 {
        let name = NonZeroU32::new(self.next_name).unwrap_or(NonZeroU32::MIN);
        self.next_name = self.next_name.wrapping_add(1).max(1);
        *self.created.entry(kind).or_default() += 1;
        name
    }

    fn freed(&mut self, kind: ObjectKind) {
        *self.deleted.entry(kind).or_default() += 1;
    }

    fn bound_vao_mut(&mut self) -> Option<&mut VertexArrayObject> {
        let vao = self.vertex_array?;
        self.vertex_arrays.get_mut(&vao)
    }

    fn buffer_for(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self
                .vertex_array
                .and_then(|v| self.vertex_arrays.get(&v))
                .and_then(|v| v.element_buffer),
        }
    }

    fn bound_texture(&self) -> Option<TextureId> {
        self.unit_textures.get(&self.active_unit).copied()
    }

    fn current_uniform_slot(&mut self, location: UniformLocation) -> Option<&mut ProgramObject> {
        let program = self.program?;
        let obj = self.programs.get_mut(&program)?;
        ((location.0 as usize) < obj.uniforms.len()).then_some(obj)
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        match self.current_uniform_slot(location) {
            Some(obj) => {
                obj.values.insert(location.0, value);
            }
            None => self.raise(INVALID_OPERATION),
        }
    }

    fn link(&mut self, program: ProgramId) -> Result<Vec<String>, String> {
        if let Some(log) = &self.forced_link_failure {
            return Err(log.clone());
        }
        let Some(obj) = self.programs.get(&program) else {
            return Err("error: unknown program".to_string());
        };

        let mut vertex = None;
        let mut fragment = None;
        for id in &obj.attached {
            let Some(shader) = self.shaders.get(id) else {
                return Err(format!("error: attached shader {} no longer exists", id.get()));
            };
            if !shader.compiled {
                return Err(format!("error: {} shader is not compiled", shader.kind));
            }
            match shader.kind {
                StageKind::Vertex => vertex = Some(shader),
                StageKind::Fragment => fragment = Some(shader),
            }
        }
        let Some(vertex) = vertex else {
            return Err("error: program has no compiled vertex shader".to_string());
        };
        let Some(fragment) = fragment else {
            return Err("error: program has no compiled fragment shader".to_string());
        };

        let outputs = stage_variables(&vertex.source, "out");
        for input in stage_variables(&fragment.source, "in") {
            if !outputs.contains(&input) {
                return Err(format!(
                    "error: fragment input `{input}` has no matching vertex output"
                ));
            }
        }

        let mut uniforms = Vec::new();
        for name in uniform_names(&vertex.source)
            .into_iter()
            .chain(uniform_names(&fragment.source))
        {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }
        Ok(uniforms)
    }
}

impl Driver for RecordingDriver {
    fn get_error(&mut self) -> u32 {
        self.errors.pop_front().unwrap_or(super::error_code::NO_ERROR)
    }

    fn version(&mut self) -> String {
        "4.1 ember recording driver".to_string()
    }

    fn create_shader(&mut self, kind: StageKind) -> Result<ShaderId, String> {
        self.record("glCreateShader");
        let id = ShaderId(self.allocate(ObjectKind::Shader));
        self.shaders.insert(
            id,
            ShaderObject {
                kind,
                source: String::new(),
                compiled: false,
                log: String::new(),
                delete_pending: false,
            },
        );
        Ok(id)
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.record("glShaderSource");
        match self.shaders.get_mut(&shader) {
            Some(obj) => obj.source = source.to_string(),
            None => self.raise(INVALID_VALUE),
        }
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        self.record("glCompileShader");
        match self.shaders.get_mut(&shader) {
            Some(obj) => match check_syntax(&obj.source) {
                Ok(()) => {
                    obj.compiled = true;
                    obj.log.clear();
                }
                Err(log) => {
                    obj.compiled = false;
                    obj.log = log;
                }
            },
            None => self.raise(INVALID_VALUE),
        }
    }

    fn compile_status(&mut self, shader: ShaderId) -> bool {
        match self.shaders.get(&shader) {
            Some(obj) => obj.compiled,
            None => {
                self.raise(INVALID_VALUE);
                false
            }
        }
    }

    fn shader_info_log(&mut self, shader: ShaderId) -> String {
        match self.shaders.get(&shader) {
            Some(obj) => obj.log.clone(),
            None => {
                self.raise(INVALID_VALUE);
                String::new()
            }
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.record("glDeleteShader");
        let pending = match self.shaders.get(&shader) {
            Some(obj) => obj.delete_pending,
            None => {
                self.raise(INVALID_VALUE);
                return;
            }
        };
        if pending {
            self.raise(INVALID_VALUE);
            return;
        }

        // GL defers deletion of attached shaders until they are detached.
        let attached = self.programs.values().any(|p| p.attached.contains(&shader));
        if attached {
            if let Some(obj) = self.shaders.get_mut(&shader) {
                obj.delete_pending = true;
            }
        } else {
            self.shaders.remove(&shader);
        }
        self.freed(ObjectKind::Shader);
    }

    fn create_program(&mut self) -> Result<ProgramId, String> {
        self.record("glCreateProgram");
        let id = ProgramId(self.allocate(ObjectKind::Program));
        self.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.record("glAttachShader");
        if !self.shaders.contains_key(&shader) {
            self.raise(INVALID_VALUE);
            return;
        }
        let Some(obj) = self.programs.get_mut(&program) else {
            self.raise(INVALID_VALUE);
            return;
        };
        if obj.attached.contains(&shader) {
            self.raise(INVALID_OPERATION);
            return;
        }
        obj.attached.push(shader);
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.record("glDetachShader");
        let Some(obj) = self.programs.get_mut(&program) else {
            self.raise(INVALID_VALUE);
            return;
        };
        let Some(pos) = obj.attached.iter().position(|s| *s == shader) else {
            self.raise(INVALID_OPERATION);
            return;
        };
        obj.attached.remove(pos);

        let still_attached = self.programs.values().any(|p| p.attached.contains(&shader));
        if !still_attached && self.shaders.get(&shader).is_some_and(|s| s.delete_pending) {
            self.shaders.remove(&shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) {
        self.record("glLinkProgram");
        if !self.programs.contains_key(&program) {
            self.raise(INVALID_VALUE);
            return;
        }
        let outcome = self.link(program);
        if let Some(obj) = self.programs.get_mut(&program) {
            obj.values.clear();
            match outcome {
                Ok(uniforms) => {
                    obj.linked = true;
                    obj.uniforms = uniforms;
                    obj.log.clear();
                }
                Err(log) => {
                    obj.linked = false;
                    obj.uniforms.clear();
                    obj.log = log;
                }
            }
        }
    }

    fn link_status(&mut self, program: ProgramId) -> bool {
        match self.programs.get(&program) {
            Some(obj) => obj.linked,
            None => {
                self.raise(INVALID_VALUE);
                false
            }
        }
    }

    fn validate_program(&mut self, program: ProgramId) {
        self.record("glValidateProgram");
        let forced = self.forced_validation_failure;
        match self.programs.get_mut(&program) {
            Some(obj) => {
                obj.validated = obj.linked && !forced;
                if !obj.validated {
                    obj.log = "validation: program is not executable in the current state"
                        .to_string();
                }
            }
            None => self.raise(INVALID_VALUE),
        }
    }

    fn validate_status(&mut self, program: ProgramId) -> bool {
        match self.programs.get(&program) {
            Some(obj) => obj.validated,
            None => {
                self.raise(INVALID_VALUE);
                false
            }
        }
    }

    fn program_info_log(&mut self, program: ProgramId) -> String {
        match self.programs.get(&program) {
            Some(obj) => obj.log.clone(),
            None => {
                self.raise(INVALID_VALUE);
                String::new()
            }
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.record("glUseProgram");
        match program {
            None => self.program = None,
            Some(id) => match self.programs.get(&id) {
                Some(obj) if obj.linked => self.program = Some(id),
                Some(_) => self.raise(INVALID_OPERATION),
                None => self.raise(INVALID_VALUE),
            },
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.record("glDeleteProgram");
        let Some(obj) = self.programs.remove(&program) else {
            self.raise(INVALID_VALUE);
            return;
        };
        if self.program == Some(program) {
            self.program = None;
        }
        // Deleting a program detaches its shaders; flagged ones go away with it.
        for shader in obj.attached {
            let still_attached = self.programs.values().any(|p| p.attached.contains(&shader));
            if !still_attached && self.shaders.get(&shader).is_some_and(|s| s.delete_pending) {
                self.shaders.remove(&shader);
            }
        }
        self.freed(ObjectKind::Program);
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.record("glGetUniformLocation");
        self.uniform_lookups += 1;
        match self.programs.get(&program) {
            Some(obj) if obj.linked => obj
                .uniforms
                .iter()
                .position(|u| u == name)
                .map(|i| UniformLocation(i as u32)),
            Some(_) => {
                self.raise(INVALID_OPERATION);
                None
            }
            None => {
                self.raise(INVALID_VALUE);
                None
            }
        }
    }

    fn uniform_mat4(&mut self, location: UniformLocation, columns: &[f32; 16]) {
        self.record("glUniformMatrix4fv");
        self.set_uniform(location, UniformValue::Mat4(*columns));
    }

    fn uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.record("glUniform1i");
        self.set_uniform(location, UniformValue::I32(value));
    }

    fn uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.record("glUniform1f");
        self.set_uniform(location, UniformValue::F32(value));
    }

    fn create_buffer(&mut self) -> Result<BufferId, String> {
        self.record("glGenBuffers");
        let id = BufferId(self.allocate(ObjectKind::Buffer));
        self.buffers.insert(id, BufferObject::default());
        Ok(id)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        self.record("glBindBuffer");
        if buffer.is_some_and(|b| !self.buffers.contains_key(&b)) {
            self.raise(INVALID_VALUE);
            return;
        }
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => match self.bound_vao_mut() {
                Some(vao) => vao.element_buffer = buffer,
                // Core profile: element bindings live in a vertex array.
                None => self.raise(INVALID_OPERATION),
            },
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.record("glBufferData");
        let Some(buffer) = self.buffer_for(target) else {
            self.raise(INVALID_OPERATION);
            return;
        };
        if let Some(obj) = self.buffers.get_mut(&buffer) {
            obj.len = data.len();
            obj.usage = Some(usage);
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.record("glDeleteBuffers");
        if self.buffers.remove(&buffer).is_none() {
            self.raise(INVALID_VALUE);
            return;
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        for vao in self.vertex_arrays.values_mut() {
            if vao.element_buffer == Some(buffer) {
                vao.element_buffer = None;
            }
        }
        self.freed(ObjectKind::Buffer);
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, String> {
        self.record("glGenVertexArrays");
        let id = VertexArrayId(self.allocate(ObjectKind::VertexArray));
        self.vertex_arrays.insert(id, VertexArrayObject::default());
        Ok(id)
    }

    fn bind_vertex_array(&mut self, vao: Option<VertexArrayId>) {
        self.record("glBindVertexArray");
        if vao.is_some_and(|v| !self.vertex_arrays.contains_key(&v)) {
            self.raise(INVALID_OPERATION);
            return;
        }
        self.vertex_array = vao;
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) {
        self.record("glDeleteVertexArrays");
        if self.vertex_arrays.remove(&vao).is_none() {
            self.raise(INVALID_VALUE);
            return;
        }
        if self.vertex_array == Some(vao) {
            self.vertex_array = None;
        }
        self.freed(ObjectKind::VertexArray);
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
        self.record("glVertexAttribPointer");
        self.store_attrib(location, components, ty, normalized, false, stride, offset);
    }

    fn vertex_attrib_pointer_int(
        &mut self,
        location: u32,
        components: u32,
        ty: ComponentType,
        stride: u32,
        offset: u32,
    ) {
        self.record("glVertexAttribIPointer");
        if !ty.is_integer() {
            self.raise(super::error_code::INVALID_ENUM);
            return;
        }
        self.store_attrib(location, components, ty, false, true, stride, offset);
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.record("glEnableVertexAttribArray");
        match self.bound_vao_mut() {
            Some(vao) => {
                vao.enabled.insert(location);
            }
            None => self.raise(INVALID_OPERATION),
        }
    }

    fn create_texture(&mut self) -> Result<TextureId, String> {
        self.record("glGenTextures");
        let id = TextureId(self.allocate(ObjectKind::Texture));
        self.textures.insert(id, TextureObject::default());
        Ok(id)
    }

    fn active_texture(&mut self, unit: u32) {
        self.record("glActiveTexture");
        // GL guarantees at least 16 fragment texture units.
        if unit >= 16 {
            self.raise(super::error_code::INVALID_ENUM);
            return;
        }
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.record("glBindTexture");
        match texture {
            None => {
                self.unit_textures.remove(&self.active_unit);
            }
            Some(id) if self.textures.contains_key(&id) => {
                self.unit_textures.insert(self.active_unit, id);
            }
            Some(_) => self.raise(INVALID_VALUE),
        }
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        self.record("glTexImage2D");
        let expected = width as usize * height as usize * format.channels() as usize;
        let Some(texture) = self.bound_texture() else {
            self.raise(INVALID_OPERATION);
            return;
        };
        if pixels.len() < expected {
            self.raise(INVALID_OPERATION);
            return;
        }
        if let Some(obj) = self.textures.get_mut(&texture) {
            obj.width = width;
            obj.height = height;
            obj.format = Some(format);
        }
    }

    fn tex_parameters(&mut self, params: SamplerParams) {
        self.record("glTexParameteri");
        match self.bound_texture().and_then(|t| self.textures.get_mut(&t)) {
            Some(obj) => obj.params = Some(params),
            None => self.raise(INVALID_OPERATION),
        }
    }

    fn generate_mipmap(&mut self) {
        self.record("glGenerateMipmap");
        let texture = self.bound_texture();
        let uploaded = texture
            .and_then(|t| self.textures.get(&t))
            .is_some_and(|obj| obj.format.is_some());
        if !uploaded {
            self.raise(INVALID_OPERATION);
            return;
        }
        if let Some(obj) = texture.and_then(|t| self.textures.get_mut(&t)) {
            obj.mipmapped = true;
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.record("glDeleteTextures");
        if self.textures.remove(&texture).is_none() {
            self.raise(INVALID_VALUE);
            return;
        }
        self.unit_textures.retain(|_, t| *t != texture);
        self.freed(ObjectKind::Texture);
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.record("glViewport");
        self.viewport = (x, y, width, height);
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.record("glClearColor");
        self.clear_color = rgba;
    }

    fn clear(&mut self, mask: ClearMask) {
        self.record("glClear");
        self.clears.push(mask);
    }

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        self.record(if enabled { "glEnable" } else { "glDisable" });
        if enabled {
            self.capabilities.insert(cap);
        } else {
            self.capabilities.remove(&cap);
        }
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) {
        self.record("glDrawArrays");
        let (Some(program), Some(vao)) = (self.program, self.vertex_array) else {
            self.raise(INVALID_OPERATION);
            return;
        };
        self.draws.push(DrawRecord::Arrays {
            mode,
            first,
            count,
            program,
            vao,
        });
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32, offset: u32) {
        self.record("glDrawElements");
        let (Some(program), Some(vao)) = (self.program, self.vertex_array) else {
            self.raise(INVALID_OPERATION);
            return;
        };
        let Some(element_buffer) = self.element_buffer(vao) else {
            self.raise(INVALID_OPERATION);
            return;
        };
        self.draws.push(DrawRecord::Elements {
            mode,
            count,
            offset,
            program,
            vao,
            element_buffer,
        });
    }
}

impl RecordingDriver {
    #[allow(clippy::too_many_arguments)]
    fn store_attrib(
        &mut self,
        location: u32,
        components: u32,
        ty: ComponentType,
        normalized: bool,
        integer: bool,
        stride: u32,
        offset: u32,
    ) {
        if !(1..=4).contains(&components) {
            self.raise(INVALID_VALUE);
            return;
        }
        let Some(buffer) = self.array_buffer else {
            self.raise(INVALID_OPERATION);
            return;
        };
        match self.bound_vao_mut() {
            Some(vao) => {
                vao.attribs.insert(
                    location,
                    AttribRecord {
                        location,
                        components,
                        ty,
                        normalized,
                        integer,
                        stride,
                        offset,
                        buffer,
                    },
                );
            }
            None => self.raise(INVALID_OPERATION),
        }
    }
}

// ── source inspection ─────────────────────────────────────────────────────

fn check_syntax(source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err("0:0: error: empty shader source".to_string());
    }

    let mut braces = 0i64;
    let mut parens = 0i64;
    for (n, line) in source.lines().enumerate() {
        let line_no = n + 1;
        let code = line.split("//").next().unwrap_or("");
        if code.trim_start().starts_with("#error") {
            return Err(format!("0:{line_no}: error: {}", code.trim()));
        }
        for ch in code.chars() {
            match ch {
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            }
            if braces < 0 || parens < 0 {
                return Err(format!("0:{line_no}: error: syntax error, unexpected '{ch}'"));
            }
        }
    }

    if braces != 0 {
        return Err("0:0: error: syntax error, unexpected end of file (unbalanced '{')".into());
    }
    if parens != 0 {
        return Err("0:0: error: syntax error, unexpected end of file (unbalanced '(')".into());
    }
    if !source.contains("void main") {
        return Err("0:0: error: missing entry point `void main()`".to_string());
    }
    Ok(())
}

/// Strips a leading `layout(...)` qualifier from a declaration line.
fn strip_layout(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with("layout") {
        if let Some(end) = line.find(')') {
            return line[end + 1..].trim_start();
        }
    }
    line
}

/// Names declared by `<qualifier> <type> <name>[, <name>...];` lines.
fn declared_names(source: &str, qualifier: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in source.lines() {
        let code = line.split("//").next().unwrap_or("");
        let decl = strip_layout(code);
        let Some(rest) = decl.strip_prefix(qualifier) else { continue };
        if !rest.starts_with(char::is_whitespace) || !decl.contains(';') || decl.contains('{') {
            continue;
        }
        let body = rest.split(';').next().unwrap_or("").trim();
        // Skip precision/interpolation qualifiers and the type; the rest are declarators.
        let mut tokens = body.splitn(2, char::is_whitespace);
        let _ty = tokens.next();
        let Some(declarators) = tokens.next() else { continue };
        for declarator in declarators.split(',') {
            let name = declarator
                .split('=')
                .next()
                .unwrap_or("")
                .split('[')
                .next()
                .unwrap_or("")
                .split_whitespace()
                .last()
                .unwrap_or("");
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn uniform_names(source: &str) -> Vec<String> {
    declared_names(source, "uniform")
}

fn stage_variables(source: &str, qualifier: &str) -> Vec<String> {
    declared_names(source, qualifier)
}
