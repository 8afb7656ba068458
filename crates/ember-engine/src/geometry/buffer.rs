use bytemuck::Pod;

use crate::device::Gpu;
use crate::driver::{BufferId, BufferTarget, BufferUsage, Driver};
use crate::error::{DriverError, EngineError, Result};

/// A vertex buffer on the GPU.
#[derive(Debug)]
pub struct GeometryBuffer {
    id: BufferId,
    byte_len: usize,
    usage: BufferUsage,
}

impl GeometryBuffer {
    /// Allocates a buffer and uploads `bytes` into it.
    ///
    /// Empty data is rejected; the driver would accept it but nothing could
    /// be drawn from the result.
    pub fn create<D: Driver>(gpu: &mut Gpu<D>, bytes: &[u8], usage: BufferUsage) -> Result<Self> {
        if bytes.is_empty() {
            return Err(EngineError::resource("vertex buffer", "no vertex data"));
        }
        let id = upload(gpu, "vertex buffer", bytes, usage)?;
        log::debug!("vertex buffer {} created ({} bytes, {usage:?})", id.get(), bytes.len());
        Ok(Self {
            id,
            byte_len: bytes.len(),
            usage,
        })
    }

    /// Uploads a slice of plain vertex structs with static usage.
    pub fn from_vertices<D: Driver, T: Pod>(gpu: &mut Gpu<D>, vertices: &[T]) -> Result<Self> {
        Self::create(gpu, bytemuck::cast_slice(vertices), BufferUsage::Static)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        delete(gpu, self.id)
    }
}

/// An index buffer of `u32` indices.
#[derive(Debug)]
pub struct IndexBuffer {
    id: BufferId,
    count: u32,
}

impl IndexBuffer {
    /// Allocates a buffer and uploads `indices`.
    ///
    /// The data goes through the array target so no vertex array has to be
    /// bound; `Mesh::new` attaches the buffer to its layout afterwards.
    pub fn create<D: Driver>(gpu: &mut Gpu<D>, indices: &[u32]) -> Result<Self> {
        if indices.is_empty() {
            return Err(EngineError::resource("index buffer", "no indices"));
        }
        let count = u32::try_from(indices.len())
            .map_err(|_| EngineError::resource("index buffer", "more than u32::MAX indices"))?;
        let id = upload(gpu, "index buffer", bytemuck::cast_slice(indices), BufferUsage::Static)?;
        log::debug!("index buffer {} created ({count} indices)", id.get());
        Ok(Self { id, count })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Number of indices; always the element count of a draw.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        delete(gpu, self.id)
    }
}

fn upload<D: Driver>(
    gpu: &mut Gpu<D>,
    resource: &'static str,
    bytes: &[u8],
    usage: BufferUsage,
) -> Result<BufferId> {
    let id = gpu
        .call("glGenBuffers", |gl| gl.create_buffer())?
        .map_err(|reason| EngineError::resource(resource, reason))?;

    let filled = gpu
        .call("glBindBuffer(GL_ARRAY_BUFFER)", |gl| gl.bind_buffer(BufferTarget::Array, Some(id)))
        .and_then(|()| {
            gpu.call("glBufferData(GL_ARRAY_BUFFER)", |gl| {
                gl.buffer_data(BufferTarget::Array, bytes, usage)
            })
        })
        .and_then(|()| {
            gpu.call("glBindBuffer(GL_ARRAY_BUFFER, 0)", |gl| {
                gl.bind_buffer(BufferTarget::Array, None)
            })
        });

    if let Err(err) = filled {
        let _ = delete(gpu, id);
        return Err(err.into());
    }
    Ok(id)
}

fn delete<D: Driver>(gpu: &mut Gpu<D>, id: BufferId) -> Result<(), DriverError> {
    gpu.call("glDeleteBuffers", |gl| gl.delete_buffer(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ObjectKind, error_code};
    use crate::test_support::{gpu, strict_gpu};

    #[test]
    fn vertices_are_uploaded_with_their_byte_length() {
        let (mut gpu, sink) = gpu();
        let vertices: [[f32; 3]; 3] = [[0.0, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]];
        let buffer = GeometryBuffer::from_vertices(&mut gpu, &vertices).unwrap();

        assert_eq!(buffer.byte_len(), 36);
        assert_eq!(gpu.driver().buffer_len(buffer.id()), Some(36));
        assert_eq!(gpu.driver().buffer_usage(buffer.id()), Some(BufferUsage::Static));
        assert!(sink.is_empty());

        buffer.release(&mut gpu).unwrap();
        assert_eq!(gpu.driver().live_count(ObjectKind::Buffer), 0);
    }

    #[test]
    fn empty_data_is_a_resource_error() {
        let (mut gpu, _) = gpu();
        let err = GeometryBuffer::create(&mut gpu, &[], BufferUsage::Static).unwrap_err();
        assert!(matches!(err, EngineError::ResourceCreation { resource: "vertex buffer", .. }));

        let err = IndexBuffer::create(&mut gpu, &[]).unwrap_err();
        assert!(matches!(err, EngineError::ResourceCreation { resource: "index buffer", .. }));
        assert_eq!(gpu.driver().created_count(ObjectKind::Buffer), 0);
    }

    #[test]
    fn index_buffer_counts_indices() {
        let (mut gpu, _) = gpu();
        let indices = IndexBuffer::create(&mut gpu, &[0, 1, 2, 2, 3, 0]).unwrap();
        assert_eq!(indices.count(), 6);
        assert_eq!(gpu.driver().buffer_len(indices.id()), Some(24));
        indices.release(&mut gpu).unwrap();
    }

    #[test]
    fn strict_upload_failure_frees_the_buffer() {
        let (mut gpu, sink) = strict_gpu();
        gpu.driver_mut().fail_next("glBufferData", error_code::OUT_OF_MEMORY);

        let err =
            GeometryBuffer::create(&mut gpu, &[1, 2, 3, 4], BufferUsage::Dynamic).unwrap_err();
        match err {
            EngineError::Driver(err) => assert_eq!(err.code, error_code::OUT_OF_MEMORY),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.len(), 1);
        assert_eq!(gpu.driver().created_count(ObjectKind::Buffer), 1);
        assert_eq!(gpu.driver().live_count(ObjectKind::Buffer), 0);
    }

    #[test]
    fn lenient_upload_failure_keeps_the_buffer() {
        let (mut gpu, sink) = gpu();
        gpu.driver_mut().fail_next("glBufferData", error_code::OUT_OF_MEMORY);

        let buffer = GeometryBuffer::create(&mut gpu, &[1, 2, 3, 4], BufferUsage::Dynamic).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].call, "glBufferData(GL_ARRAY_BUFFER)");
        buffer.release(&mut gpu).unwrap();
    }
}
