use crate::core::GraphicsContext;
use crate::device::Gpu;
use crate::driver::{Capability, ClearMask, Driver};
use crate::error::{DriverError, EngineError, Result};
use crate::geometry::{Mesh, first_error};
use crate::shader::ShaderProgram;
use crate::texture::Texture2d;
use crate::time::FrameClock;

use super::{FrameState, RendererConfig};

/// Frames rendered and time spent by `FrameRenderer::run`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: f32,
}

/// Collects the objects a `FrameRenderer` will own.
#[derive(Debug)]
pub struct FrameRendererBuilder {
    config: RendererConfig,
    program: Option<ShaderProgram>,
    meshes: Vec<Mesh>,
    texture: Option<Texture2d>,
}

impl FrameRendererBuilder {
    pub fn program(mut self, program: ShaderProgram) -> Self {
        self.program = Some(program);
        self
    }

    pub fn mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// The texture must live on `config.texture_unit`.
    pub fn texture(mut self, texture: Texture2d) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Deletes everything handed to the builder so far.
    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        release_all(gpu, self.program, self.meshes, self.texture)
    }

    /// Applies the fixed pipeline state and returns the renderer.
    ///
    /// On error everything handed to the builder is released.
    pub fn build<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<FrameRenderer> {
        let Some(program) = self.program else {
            let err = EngineError::resource("frame renderer", "no shader program");
            let _ = release_all(gpu, None, self.meshes, self.texture);
            return Err(err);
        };

        let mut renderer = FrameRenderer {
            config: self.config,
            program,
            meshes: self.meshes,
            texture: self.texture,
            clock: FrameClock::new(),
            frames: 0,
        };

        if let Some(texture) = &renderer.texture {
            if texture.unit() != renderer.config.texture_unit {
                let err = EngineError::resource(
                    "frame renderer",
                    format!(
                        "texture is on unit {} but the sampler reads unit {}",
                        texture.unit(),
                        renderer.config.texture_unit
                    ),
                );
                let _ = renderer.release(gpu);
                return Err(err);
            }
        }

        if let Err(err) = renderer.apply_fixed_state(gpu) {
            let _ = renderer.release(gpu);
            return Err(err.into());
        }

        log::info!(
            "frame renderer ready: {} mesh(es), texture: {}, depth test: {}",
            renderer.meshes.len(),
            renderer.texture.is_some(),
            renderer.config.depth_test
        );
        Ok(renderer)
    }
}

/// Owns the per-frame loop and everything it draws.
#[derive(Debug)]
pub struct FrameRenderer {
    config: RendererConfig,
    program: ShaderProgram,
    meshes: Vec<Mesh>,
    texture: Option<Texture2d>,
    clock: FrameClock,
    frames: u64,
}

impl FrameRenderer {
    pub fn builder(config: RendererConfig) -> FrameRendererBuilder {
        FrameRendererBuilder {
            config,
            program: None,
            meshes: Vec::new(),
            texture: None,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Mutable access, e.g. to rebuild the program from edited sources.
    pub fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn apply_fixed_state<D: Driver>(&self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let rgba = self.config.clear_color;
        let depth = self.config.depth_test;
        gpu.call("glClearColor", |gl| gl.clear_color(rgba))?;
        let call = if depth {
            "glEnable(GL_DEPTH_TEST)"
        } else {
            "glDisable(GL_DEPTH_TEST)"
        };
        gpu.call(call, |gl| gl.set_capability(Capability::DepthTest, depth))
    }

    /// Renders one frame at `elapsed` seconds into a `width` × `height`
    /// framebuffer. Does not present.
    pub fn render_frame<D: Driver>(
        &mut self,
        gpu: &mut Gpu<D>,
        elapsed: f32,
        (width, height): (u32, u32),
    ) -> Result<FrameState> {
        gpu.call("glViewport", |gl| gl.viewport(0, 0, width, height))?;
        let mask = if self.config.depth_test {
            ClearMask::COLOR_DEPTH
        } else {
            ClearMask::COLOR
        };
        gpu.call("glClear", |gl| gl.clear(mask))?;

        let aspect = width as f32 / height.max(1) as f32;
        let state = FrameState::at(elapsed, &self.config.transform, aspect);

        self.program.bind(gpu)?;
        let names = &self.config.uniforms;
        self.program.set_mat4(gpu, &names.model, &state.model)?;
        self.program.set_mat4(gpu, &names.view, &state.view)?;
        self.program.set_mat4(gpu, &names.projection, &state.projection)?;
        self.program.set_f32(gpu, &names.time, elapsed)?;

        if let Some(texture) = &self.texture {
            // Sampler uniforms take the unit index, not the texture name.
            self.program.set_i32(gpu, &names.texture, texture.unit() as i32)?;
            texture.bind(gpu)?;
        }

        for mesh in &self.meshes {
            mesh.draw(gpu)?;
        }

        self.frames += 1;
        Ok(state)
    }

    /// Runs frames until `context.should_close()`, then releases everything.
    ///
    /// A frame error (escalated by the strict diagnostics policy, or a
    /// present failure) stops the loop; owned objects are still released
    /// before the error is returned.
    pub fn run<D: Driver, C: GraphicsContext>(
        mut self,
        gpu: &mut Gpu<D>,
        context: &mut C,
    ) -> Result<RunSummary> {
        let outcome = self.run_loop(gpu, context);
        let released = self.release(gpu);

        let summary = outcome.inspect_err(|err| log::error!("render loop stopped: {err}"))?;
        released?;
        log::info!(
            "render loop finished: {} frame(s) in {:.2}s",
            summary.frames,
            summary.elapsed
        );
        Ok(summary)
    }

    fn run_loop<D: Driver, C: GraphicsContext>(
        &mut self,
        gpu: &mut Gpu<D>,
        context: &mut C,
    ) -> Result<RunSummary> {
        self.clock.reset();
        let mut elapsed = 0.0;
        let start = self.frames;

        while !context.should_close() {
            let time = self.clock.tick();
            elapsed = time.elapsed;

            let size = context.framebuffer_size();
            if size.0 == 0 || size.1 == 0 {
                // Nothing to present, so nothing else blocks this iteration.
                context.wait_events();
                continue;
            }

            self.render_frame(gpu, time.elapsed, size)?;
            context.present_frame()?;
            context.poll_events();

            if time.frame_index % 600 == 0 {
                log::debug!("frame {}: dt {:.2} ms", time.frame_index, time.dt * 1000.0);
            }
        }

        Ok(RunSummary {
            frames: self.frames - start,
            elapsed,
        })
    }

    /// Deletes the program, meshes and texture.
    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        release_all(gpu, Some(self.program), self.meshes, self.texture)
    }
}

fn release_all<D: Driver>(
    gpu: &mut Gpu<D>,
    program: Option<ShaderProgram>,
    meshes: Vec<Mesh>,
    texture: Option<Texture2d>,
) -> Result<(), DriverError> {
    let mut results = Vec::with_capacity(meshes.len() + 2);
    results.extend(meshes.into_iter().map(|mesh| mesh.release(gpu)));
    if let Some(texture) = texture {
        results.push(texture.release(gpu));
    }
    if let Some(program) = program {
        results.push(program.release(gpu));
    }
    first_error(results)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use glam::{Mat4, Vec3};

    use super::*;
    use crate::core::HeadlessContext;
    use crate::driver::{DrawRecord, ObjectKind, RecordingDriver, UniformValue, error_code};
    use crate::frame::TransformConfig;
    use crate::geometry::VertexAttribute;
    use crate::shader::{ShaderSource, build_program};
    use crate::test_support::{BASIC_FS, BASIC_VS, gpu, strict_gpu};
    use crate::texture::DecodedImage;

    const TEXTURED_VS: &str = "#version 410 core
layout(location = 0) in vec2 a_Position;
layout(location = 1) in vec2 a_TexCoord;
uniform mat4 u_Model;
out vec2 v_TexCoord;
void main() {
    v_TexCoord = a_TexCoord;
    gl_Position = u_Model * vec4(a_Position, 0.0, 1.0);
}
";

    const TEXTURED_FS: &str = "#version 410 core
in vec2 v_TexCoord;
uniform sampler2D u_Texture;
out vec4 o_Color;
void main() {
    o_Color = texture(u_Texture, v_TexCoord);
}
";

    fn program(gpu: &mut Gpu<RecordingDriver>, vs: &str, fs: &str) -> ShaderProgram {
        build_program(gpu, &ShaderSource::vertex(vs), &ShaderSource::fragment(fs)).unwrap()
    }

    fn quad(gpu: &mut Gpu<RecordingDriver>) -> Mesh {
        let vertices: [[f32; 3]; 4] = [
            [-0.5, -0.5, 0.0],
            [0.5, -0.5, 0.0],
            [0.5, 0.5, 0.0],
            [-0.5, 0.5, 0.0],
        ];
        let indices = [0u32, 1, 2, 2, 3, 0];
        let attributes = [VertexAttribute::f32(0, 3)];
        Mesh::from_vertices(gpu, &vertices, &attributes, Some(&indices[..])).unwrap()
    }

    fn cube(gpu: &mut Gpu<RecordingDriver>) -> Mesh {
        let vertices = [[0.25f32; 6]; 36];
        Mesh::from_vertices(
            gpu,
            &vertices,
            &[VertexAttribute::f32(0, 3), VertexAttribute::f32(1, 3)],
            None,
        )
        .unwrap()
    }

    fn assert_nothing_alive(gl: &RecordingDriver) {
        for kind in [
            ObjectKind::Shader,
            ObjectKind::Program,
            ObjectKind::Buffer,
            ObjectKind::VertexArray,
            ObjectKind::Texture,
        ] {
            assert_eq!(gl.live_count(kind), 0, "{kind:?} still alive");
        }
    }

    #[test]
    fn indexed_quad_is_one_draw_elements_of_six() {
        let (mut gpu, sink) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let mut renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        renderer.render_frame(&mut gpu, 0.0, (800, 600)).unwrap();

        let gl = gpu.driver();
        let draws = gl.draws();
        assert_eq!(draws.len(), 1);
        assert!(draws[0].is_indexed());
        assert!(matches!(draws[0], DrawRecord::Elements { count: 6, .. }));
        assert_eq!(gl.call_count("glDrawArrays"), 0);
        assert_eq!(gl.current_viewport(), (0, 0, 800, 600));
        assert_eq!(gl.current_clear_color(), RendererConfig::default().clear_color);

        let last = |name: &str| gl.calls().iter().rposition(|c| *c == name).unwrap();
        assert!(last("glViewport") < last("glClear"));
        assert!(last("glClear") < last("glUseProgram"));
        assert!(last("glUseProgram") < last("glDrawElements"));
        assert!(sink.is_empty());

        renderer.release(&mut gpu).unwrap();
        assert_nothing_alive(gpu.driver());
    }

    #[test]
    fn cube_is_one_draw_arrays_of_thirty_six() {
        let (mut gpu, _) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = cube(&mut gpu);
        let config = RendererConfig::default().depth_test(true);
        let mut renderer = FrameRenderer::builder(config)
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        renderer.render_frame(&mut gpu, 1.0, (640, 480)).unwrap();

        let gl = gpu.driver();
        assert_eq!(gl.draws().len(), 1);
        assert!(matches!(gl.draws()[0], DrawRecord::Arrays { first: 0, count: 36, .. }));
        assert!(gl.capability_enabled(Capability::DepthTest));
        assert_eq!(gl.clears(), &[ClearMask::COLOR_DEPTH]);
        renderer.release(&mut gpu).unwrap();
    }

    #[test]
    fn transforms_and_time_reach_the_program() {
        let (mut gpu, _) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let config = RendererConfig::default()
            .transform(TransformConfig::default().rotation(Vec3::Z, 1.0));
        let mut renderer = FrameRenderer::builder(config)
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        let state = renderer.render_frame(&mut gpu, PI, (100, 100)).unwrap();
        assert!(state.model.abs_diff_eq(Mat4::from_rotation_z(PI), 1e-6));

        let id = renderer.program().id();
        let gl = gpu.driver();
        assert_eq!(
            gl.uniform_value(id, "u_Model"),
            Some(UniformValue::Mat4(state.model.to_cols_array()))
        );
        assert_eq!(
            gl.uniform_value(id, "u_View"),
            Some(UniformValue::Mat4(Mat4::IDENTITY.to_cols_array()))
        );
        assert_eq!(gl.uniform_value(id, "u_Time"), Some(UniformValue::F32(PI)));
        renderer.release(&mut gpu).unwrap();
    }

    #[test]
    fn missing_uniforms_are_skipped() {
        let (mut gpu, sink) = gpu();
        // Only u_Model and u_Texture exist in this program.
        let program = program(&mut gpu, TEXTURED_VS, TEXTURED_FS);
        let vertices = [[0.0f32; 4]; 4];
        let mesh = Mesh::from_vertices(
            &mut gpu,
            &vertices,
            &[VertexAttribute::f32(0, 2), VertexAttribute::f32(1, 2)],
            Some(&[0, 1, 2, 2, 3, 0][..]),
        )
        .unwrap();
        let image = DecodedImage::checkerboard(2, 2, [255; 4], [0; 4]).unwrap();
        let texture = Texture2d::upload(&mut gpu, &image, 0).unwrap();

        let mut renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .texture(texture)
            .build(&mut gpu)
            .unwrap();

        renderer.render_frame(&mut gpu, 0.5, (800, 600)).unwrap();
        renderer.render_frame(&mut gpu, 0.6, (800, 600)).unwrap();

        let id = renderer.program().id();
        assert_eq!(gpu.driver().uniform_value(id, "u_Texture"), Some(UniformValue::I32(0)));
        assert_eq!(gpu.driver().draws().len(), 2);
        // Lookups for the five names happen once, not once per frame.
        assert_eq!(gpu.driver().uniform_lookups(), 5);
        assert!(sink.is_empty());
        renderer.release(&mut gpu).unwrap();
    }

    #[test]
    fn run_draws_until_close_and_releases_everything() {
        let (mut gpu, _) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        let mut context = HeadlessContext::new(320, 240, 3);
        let summary = renderer.run(&mut gpu, &mut context).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(context.presented(), 3);
        assert_eq!(gpu.driver().draws().len(), 3);
        assert_nothing_alive(gpu.driver());
    }

    #[test]
    fn strict_policy_stops_the_loop_and_releases_everything() {
        let (mut gpu, sink) = strict_gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        gpu.driver_mut().fail_next("glDrawElements", error_code::INVALID_OPERATION);
        let mut context = HeadlessContext::new(320, 240, 10);
        let err = renderer.run(&mut gpu, &mut context).unwrap_err();

        assert!(matches!(err, EngineError::Driver(ref e) if e.call == "glDrawElements"));
        assert_eq!(context.presented(), 0);
        assert_eq!(sink.len(), 1);
        assert_nothing_alive(gpu.driver());
    }

    #[test]
    fn zero_sized_framebuffer_waits_instead_of_spinning() {
        let (mut gpu, _) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        let mut context = HeadlessContext::new(0, 0, 3);
        let summary = renderer.run(&mut gpu, &mut context).unwrap();

        assert_eq!(summary.frames, 0);
        assert_eq!(context.skipped(), 3);
        assert_eq!(context.presented(), 0);
        assert!(gpu.driver().draws().is_empty());
        assert_nothing_alive(gpu.driver());
    }

    /// Reports an empty framebuffer until it has waited `restore_after` times.
    struct Minimized {
        inner: HeadlessContext,
        waits: u32,
        restore_after: u32,
    }

    impl GraphicsContext for Minimized {
        fn should_close(&self) -> bool {
            self.inner.should_close()
        }

        fn framebuffer_size(&self) -> (u32, u32) {
            self.inner.framebuffer_size()
        }

        fn present_frame(&mut self) -> Result<(), crate::error::ContextError> {
            self.inner.present_frame()
        }

        fn poll_events(&mut self) {
            self.inner.poll_events();
        }

        fn wait_events(&mut self) {
            self.inner.wait_events();
            self.waits += 1;
            if self.waits == self.restore_after {
                self.inner.resize(320, 240);
            }
        }
    }

    #[test]
    fn rendering_resumes_once_the_framebuffer_is_restored() {
        let (mut gpu, _) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        let mut context = Minimized {
            inner: HeadlessContext::new(0, 0, 5),
            waits: 0,
            restore_after: 2,
        };
        let summary = renderer.run(&mut gpu, &mut context).unwrap();

        assert_eq!(context.waits, 2);
        assert_eq!(summary.frames, 3);
        assert_eq!(context.inner.presented(), 3);
        assert_eq!(gpu.driver().current_viewport(), (0, 0, 320, 240));
    }

    #[test]
    fn lenient_policy_keeps_rendering_after_an_error() {
        let (mut gpu, sink) = gpu();
        let program = program(&mut gpu, BASIC_VS, BASIC_FS);
        let mesh = quad(&mut gpu);
        let renderer = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap();

        gpu.driver_mut().fail_next("glDrawElements", error_code::INVALID_OPERATION);
        let mut context = HeadlessContext::new(320, 240, 4);
        let summary = renderer.run(&mut gpu, &mut context).unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn building_without_a_program_releases_the_meshes() {
        let (mut gpu, _) = gpu();
        let mesh = quad(&mut gpu);
        let err = FrameRenderer::builder(RendererConfig::default())
            .mesh(mesh)
            .build(&mut gpu)
            .unwrap_err();

        assert!(matches!(err, EngineError::ResourceCreation { .. }));
        assert_nothing_alive(gpu.driver());
    }

    #[test]
    fn texture_on_the_wrong_unit_is_rejected() {
        let (mut gpu, _) = gpu();
        let program = program(&mut gpu, TEXTURED_VS, TEXTURED_FS);
        let image = DecodedImage::checkerboard(1, 1, [255; 4], [0; 4]).unwrap();
        let texture = Texture2d::upload(&mut gpu, &image, 2).unwrap();
        let err = FrameRenderer::builder(RendererConfig::default())
            .program(program)
            .texture(texture)
            .build(&mut gpu)
            .unwrap_err();

        assert!(matches!(err, EngineError::ResourceCreation { .. }));
        assert_nothing_alive(gpu.driver());
    }
}
