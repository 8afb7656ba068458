use bytemuck::Pod;

use crate::device::Gpu;
use crate::driver::{BufferTarget, Driver, PrimitiveMode};
use crate::error::{DriverError, Result};

use super::{GeometryBuffer, IndexBuffer, VertexAttribute, VertexLayout, first_error};

/// The single draw call a mesh needs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawCall {
    /// `glDrawElements` over `count` `u32` indices.
    Indexed { count: u32 },
    /// `glDrawArrays` over `count` vertices starting at 0.
    Arrays { count: u32 },
}

impl DrawCall {
    pub fn count(self) -> u32 {
        match self {
            DrawCall::Indexed { count } | DrawCall::Arrays { count } => count,
        }
    }
}

/// One geometry set: vertices, their layout and optional indices.
#[derive(Debug)]
pub struct Mesh {
    vertices: GeometryBuffer,
    layout: VertexLayout,
    indices: Option<IndexBuffer>,
    mode: PrimitiveMode,
}

impl Mesh {
    /// Assembles a mesh, attaching `indices` to the layout's vertex array.
    ///
    /// Takes ownership of all parts; they are released if assembly fails.
    pub fn new<D: Driver>(
        gpu: &mut Gpu<D>,
        vertices: GeometryBuffer,
        layout: VertexLayout,
        indices: Option<IndexBuffer>,
    ) -> Result<Self> {
        let mesh = Self {
            vertices,
            layout,
            indices,
            mode: PrimitiveMode::Triangles,
        };

        if mesh.vertices.byte_len() % mesh.layout.stride() as usize != 0 {
            log::warn!(
                "vertex buffer {} holds {} bytes, not a multiple of stride {}; tail ignored",
                mesh.vertices.id().get(),
                mesh.vertices.byte_len(),
                mesh.layout.stride()
            );
        }

        if let Some(ib) = &mesh.indices {
            let (vao, ib) = (mesh.layout.vao(), ib.id());
            let attached = gpu
                .call("glBindVertexArray", |gl| gl.bind_vertex_array(Some(vao)))
                .and_then(|()| {
                    gpu.call("glBindBuffer(GL_ELEMENT_ARRAY_BUFFER)", |gl| {
                        gl.bind_buffer(BufferTarget::ElementArray, Some(ib))
                    })
                })
                .and_then(|()| gpu.call("glBindVertexArray(0)", |gl| gl.bind_vertex_array(None)));
            if let Err(err) = attached {
                let _ = mesh.release(gpu);
                return Err(err.into());
            }
        }

        Ok(mesh)
    }

    /// Uploads `vertices` (and `indices`, if any) and describes them with a
    /// packed layout.
    pub fn from_vertices<D: Driver, T: Pod>(
        gpu: &mut Gpu<D>,
        vertices: &[T],
        attributes: &[VertexAttribute],
        indices: Option<&[u32]>,
    ) -> Result<Self> {
        let buffer = GeometryBuffer::from_vertices(gpu, vertices)?;

        let layout = match VertexLayout::describe(gpu, &buffer, attributes, None) {
            Ok(layout) => layout,
            Err(err) => {
                let _ = buffer.release(gpu);
                return Err(err);
            }
        };

        let indices = match indices.map(|data| IndexBuffer::create(gpu, data)).transpose() {
            Ok(indices) => indices,
            Err(err) => {
                let _ = first_error([layout.release(gpu), buffer.release(gpu)]);
                return Err(err);
            }
        };

        Self::new(gpu, buffer, layout, indices)
    }

    /// Overrides the primitive topology (triangles by default).
    pub fn with_mode(mut self, mode: PrimitiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertices(&self) -> &GeometryBuffer {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&IndexBuffer> {
        self.indices.as_ref()
    }

    pub fn draw_call(&self) -> DrawCall {
        match &self.indices {
            Some(ib) => DrawCall::Indexed { count: ib.count() },
            None => DrawCall::Arrays {
                count: self.layout.vertex_count(self.vertices.byte_len()),
            },
        }
    }

    /// Binds the vertex array (with its index buffer) and issues the draw.
    pub fn draw<D: Driver>(&self, gpu: &mut Gpu<D>) -> Result<DrawCall, DriverError> {
        self.layout.bind(gpu)?;
        let mode = self.mode;
        let call = self.draw_call();
        match call {
            DrawCall::Indexed { count } => {
                gpu.call("glDrawElements", |gl| gl.draw_elements(mode, count, 0))?
            }
            DrawCall::Arrays { count } => {
                gpu.call("glDrawArrays", |gl| gl.draw_arrays(mode, 0, count))?
            }
        }
        Ok(call)
    }

    /// Deletes the vertex array and both buffers.
    ///
    /// Every object is deleted even if an earlier deletion reports an error.
    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let layout = self.layout.release(gpu);
        let indices = match self.indices {
            Some(ib) => ib.release(gpu),
            None => Ok(()),
        };
        let vertices = self.vertices.release(gpu);
        first_error([layout, indices, vertices])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DrawRecord, ObjectKind, RecordingDriver, error_code};
    use crate::error::EngineError;
    use crate::shader::{ShaderSource, build_program};
    use crate::test_support::{BASIC_FS, BASIC_VS, gpu, strict_gpu};

    const QUAD: [[f32; 3]; 4] = [
        [-0.5, -0.5, 0.0],
        [0.5, -0.5, 0.0],
        [0.5, 0.5, 0.0],
        [-0.5, 0.5, 0.0],
    ];
    const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

    fn quad_mesh(gpu: &mut Gpu<RecordingDriver>) -> Mesh {
        let attributes = [VertexAttribute::f32(0, 3)];
        Mesh::from_vertices(gpu, &QUAD, &attributes, Some(&QUAD_INDICES[..])).unwrap()
    }

    #[test]
    fn indexed_mesh_draws_its_index_count() {
        let (mut gpu, sink) = gpu();
        let program = build_program(
            &mut gpu,
            &ShaderSource::vertex(BASIC_VS),
            &ShaderSource::fragment(BASIC_FS),
        )
        .unwrap();
        program.bind(&mut gpu).unwrap();

        let mesh = quad_mesh(&mut gpu);
        assert_eq!(mesh.draw_call(), DrawCall::Indexed { count: 6 });
        assert_eq!(
            gpu.driver().element_buffer(mesh.layout().vao()),
            mesh.indices().map(|ib| ib.id())
        );

        mesh.draw(&mut gpu).unwrap();
        let draws = gpu.driver().draws();
        assert_eq!(draws.len(), 1);
        assert!(matches!(draws[0], DrawRecord::Elements { count: 6, offset: 0, .. }));
        assert!(sink.is_empty());

        mesh.release(&mut gpu).unwrap();
        program.release(&mut gpu).unwrap();
        assert_eq!(gpu.driver().live_count(ObjectKind::Buffer), 0);
        assert_eq!(gpu.driver().live_count(ObjectKind::VertexArray), 0);
    }

    #[test]
    fn unindexed_mesh_draws_every_vertex() {
        let (mut gpu, _) = gpu();
        let vertices = [[0.0f32; 6]; 36];
        let mesh = Mesh::from_vertices(
            &mut gpu,
            &vertices,
            &[VertexAttribute::f32(0, 3), VertexAttribute::f32(1, 3)],
            None,
        )
        .unwrap();
        assert_eq!(mesh.draw_call(), DrawCall::Arrays { count: 36 });
        mesh.release(&mut gpu).unwrap();
    }

    #[test]
    fn primitive_mode_reaches_the_draw_call() {
        let (mut gpu, sink) = gpu();
        let program = build_program(
            &mut gpu,
            &ShaderSource::vertex(BASIC_VS),
            &ShaderSource::fragment(BASIC_FS),
        )
        .unwrap();
        program.bind(&mut gpu).unwrap();

        let vertices = [[0.0f32; 3]; 8];
        let mesh = Mesh::from_vertices(&mut gpu, &vertices, &[VertexAttribute::f32(0, 3)], None)
            .unwrap()
            .with_mode(PrimitiveMode::Lines);
        assert_eq!(mesh.mode(), PrimitiveMode::Lines);

        mesh.draw(&mut gpu).unwrap();
        let draws = gpu.driver().draws();
        assert!(!draws[0].is_indexed());
        assert!(matches!(
            draws[0],
            DrawRecord::Arrays {
                mode: PrimitiveMode::Lines,
                count: 8,
                ..
            }
        ));
        assert!(sink.is_empty());

        mesh.release(&mut gpu).unwrap();
        program.release(&mut gpu).unwrap();
    }

    #[test]
    fn failed_assembly_releases_the_parts() {
        let (mut gpu, _) = strict_gpu();
        let buffer = GeometryBuffer::from_vertices(&mut gpu, &QUAD).unwrap();
        let layout =
            VertexLayout::describe(&mut gpu, &buffer, &[VertexAttribute::f32(0, 3)], None).unwrap();
        let indices = IndexBuffer::create(&mut gpu, &QUAD_INDICES).unwrap();

        gpu.driver_mut().fail_next("glBindBuffer", error_code::INVALID_OPERATION);
        let err = Mesh::new(&mut gpu, buffer, layout, Some(indices)).unwrap_err();

        assert!(matches!(err, EngineError::Driver(_)));
        assert_eq!(gpu.driver().live_count(ObjectKind::Buffer), 0);
        assert_eq!(gpu.driver().live_count(ObjectKind::VertexArray), 0);
    }

    #[test]
    fn release_frees_everything_once() {
        let (mut gpu, sink) = gpu();
        let mesh = quad_mesh(&mut gpu);
        mesh.release(&mut gpu).unwrap();

        let gl = gpu.driver();
        assert_eq!(gl.deleted_count(ObjectKind::Buffer), 2);
        assert_eq!(gl.deleted_count(ObjectKind::VertexArray), 1);
        assert!(sink.is_empty());
    }
}
