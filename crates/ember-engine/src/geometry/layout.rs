use crate::device::Gpu;
use crate::driver::{BufferTarget, ComponentType, Driver, VertexArrayId};
use crate::error::{DriverError, EngineError, Result};

use super::GeometryBuffer;

/// One shader input read from a vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    /// Shader input location (`layout(location = N)`).
    pub location: u32,
    /// Components per vertex, 1..=4.
    pub components: u32,
    pub ty: ComponentType,
    /// Integer data is mapped to [0, 1] / [-1, 1] floats when set.
    pub normalized: bool,
}

impl VertexAttribute {
    pub const fn new(location: u32, components: u32, ty: ComponentType) -> Self {
        Self {
            location,
            components,
            ty,
            normalized: false,
        }
    }

    /// `components` × `f32` at `location`.
    pub const fn f32(location: u32, components: u32) -> Self {
        Self::new(location, components, ComponentType::F32)
    }

    pub const fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Size in bytes of one vertex's worth of this attribute.
    pub const fn size(&self) -> u32 {
        self.components * self.ty.size()
    }

    /// Integer inputs without normalization keep their integer type in the shader.
    fn is_integer_input(&self) -> bool {
        self.ty.is_integer() && !self.normalized
    }
}

/// A vertex-array object describing how a buffer feeds shader inputs.
#[derive(Debug)]
pub struct VertexLayout {
    vao: VertexArrayId,
    stride: u32,
    attributes: Vec<VertexAttribute>,
    offsets: Vec<u32>,
}

impl VertexLayout {
    /// Describes `buffer` with `attributes` and records the result in a new
    /// vertex-array object.
    ///
    /// Attributes are packed in declaration order. `stride` defaults to the
    /// packed size; an explicit stride may leave padding but must fit every
    /// attribute.
    pub fn describe<D: Driver>(
        gpu: &mut Gpu<D>,
        buffer: &GeometryBuffer,
        attributes: &[VertexAttribute],
        stride: Option<u32>,
    ) -> Result<Self> {
        let (stride, offsets) = compute(attributes, stride)?;

        let vao = gpu
            .call("glGenVertexArrays", |gl| gl.create_vertex_array())?
            .map_err(|reason| EngineError::resource("vertex array", reason))?;

        if let Err(err) = record_pointers(gpu, vao, buffer, attributes, &offsets, stride) {
            let _ = gpu.call("glBindVertexArray(0)", |gl| gl.bind_vertex_array(None));
            let _ = gpu.call("glDeleteVertexArrays", |gl| gl.delete_vertex_array(vao));
            return Err(err.into());
        }

        log::debug!(
            "vertex array {} describes buffer {}: {} attribute(s), stride {stride}",
            vao.get(),
            buffer.id().get(),
            attributes.len()
        );
        Ok(Self {
            vao,
            stride,
            attributes: attributes.to_vec(),
            offsets,
        })
    }

    pub fn vao(&self) -> VertexArrayId {
        self.vao
    }

    /// Bytes between consecutive vertices.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Byte offset of each attribute, parallel to `attributes()`.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Whole vertices contained in `byte_len` bytes.
    pub fn vertex_count(&self, byte_len: usize) -> u32 {
        (byte_len / self.stride as usize).try_into().unwrap_or(u32::MAX)
    }

    pub fn bind<D: Driver>(&self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let vao = self.vao;
        gpu.call("glBindVertexArray", |gl| gl.bind_vertex_array(Some(vao)))
    }

    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let vao = self.vao;
        gpu.call("glDeleteVertexArrays", |gl| gl.delete_vertex_array(vao))
    }
}

fn record_pointers<D: Driver>(
    gpu: &mut Gpu<D>,
    vao: VertexArrayId,
    buffer: &GeometryBuffer,
    attributes: &[VertexAttribute],
    offsets: &[u32],
    stride: u32,
) -> Result<(), DriverError> {
    let id = buffer.id();
    gpu.call("glBindVertexArray", |gl| gl.bind_vertex_array(Some(vao)))?;
    gpu.call("glBindBuffer(GL_ARRAY_BUFFER)", |gl| gl.bind_buffer(BufferTarget::Array, Some(id)))?;

    for (attr, &offset) in attributes.iter().zip(offsets) {
        let a = *attr;
        if a.is_integer_input() {
            gpu.call("glVertexAttribIPointer", |gl| {
                gl.vertex_attrib_pointer_int(a.location, a.components, a.ty, stride, offset)
            })?;
        } else {
            gpu.call("glVertexAttribPointer", |gl| {
                gl.vertex_attrib_pointer(
                    a.location,
                    a.components,
                    a.ty,
                    a.normalized,
                    stride,
                    offset,
                )
            })?;
        }
        gpu.call("glEnableVertexAttribArray", |gl| gl.enable_vertex_attrib_array(a.location))?;
    }

    gpu.call("glBindVertexArray(0)", |gl| gl.bind_vertex_array(None))?;
    gpu.call("glBindBuffer(GL_ARRAY_BUFFER, 0)", |gl| gl.bind_buffer(BufferTarget::Array, None))
}

/// Stride and per-attribute offsets for a packed layout.
fn compute(attributes: &[VertexAttribute], stride: Option<u32>) -> Result<(u32, Vec<u32>)> {
    if attributes.is_empty() {
        return Err(EngineError::InvalidLayout("no attributes".to_string()));
    }

    let mut offsets = Vec::with_capacity(attributes.len());
    let mut packed = 0u32;
    for (i, attr) in attributes.iter().enumerate() {
        if !(1..=4).contains(&attr.components) {
            return Err(EngineError::InvalidLayout(format!(
                "attribute at location {} has {} components (expected 1..=4)",
                attr.location, attr.components
            )));
        }
        if attributes[..i].iter().any(|a| a.location == attr.location) {
            return Err(EngineError::InvalidLayout(format!(
                "location {} is used more than once",
                attr.location
            )));
        }
        offsets.push(packed);
        packed += attr.size();
    }

    let stride = stride.unwrap_or(packed);
    for (attr, offset) in attributes.iter().zip(&offsets) {
        if offset + attr.size() > stride {
            return Err(EngineError::InvalidLayout(format!(
                "attribute at location {} spans bytes {}..{} but the stride is {stride}",
                attr.location,
                offset,
                offset + attr.size()
            )));
        }
    }
    Ok((stride, offsets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{AttribRecord, ObjectKind};
    use crate::test_support::gpu;

    #[test]
    fn position_uv_layout_is_packed() {
        let attrs = [VertexAttribute::f32(0, 3), VertexAttribute::f32(1, 2)];
        let (stride, offsets) = compute(&attrs, None).unwrap();
        assert_eq!(stride, 20);
        assert_eq!(offsets, vec![0, 12]);
    }

    #[test]
    fn explicit_stride_may_pad_but_not_truncate() {
        let attrs = [VertexAttribute::f32(0, 3), VertexAttribute::f32(1, 2)];
        assert_eq!(compute(&attrs, Some(32)).unwrap().0, 32);
        assert!(matches!(compute(&attrs, Some(16)), Err(EngineError::InvalidLayout(_))));
    }

    #[test]
    fn malformed_attributes_are_rejected() {
        assert!(compute(&[], None).is_err());
        assert!(compute(&[VertexAttribute::f32(0, 5)], None).is_err());
        assert!(compute(&[VertexAttribute::f32(0, 3), VertexAttribute::f32(0, 3)], None).is_err());
    }

    #[test]
    fn describe_issues_one_pointer_per_attribute() {
        let (mut gpu, sink) = gpu();
        let data = [0.0f32; 15];
        let buffer = GeometryBuffer::from_vertices(&mut gpu, &data).unwrap();
        let attrs = [VertexAttribute::f32(0, 3), VertexAttribute::f32(1, 2)];

        let layout = VertexLayout::describe(&mut gpu, &buffer, &attrs, None).unwrap();

        let gl = gpu.driver();
        assert_eq!(gl.call_count("glVertexAttribPointer"), 2);
        assert_eq!(gl.call_count("glEnableVertexAttribArray"), 2);
        assert_eq!(
            gl.attributes(layout.vao()),
            vec![
                AttribRecord {
                    location: 0,
                    components: 3,
                    ty: ComponentType::F32,
                    normalized: false,
                    integer: false,
                    stride: 20,
                    offset: 0,
                    buffer: buffer.id(),
                },
                AttribRecord {
                    location: 1,
                    components: 2,
                    ty: ComponentType::F32,
                    normalized: false,
                    integer: false,
                    stride: 20,
                    offset: 12,
                    buffer: buffer.id(),
                },
            ]
        );
        assert!(gl.attribute_enabled(layout.vao(), 1));
        assert_eq!(gl.bound_vertex_array(), None);
        assert_eq!(layout.vertex_count(buffer.byte_len()), 3);
        assert!(sink.is_empty());

        layout.release(&mut gpu).unwrap();
        buffer.release(&mut gpu).unwrap();
        assert_eq!(gpu.driver().live_count(ObjectKind::VertexArray), 0);
    }

    #[test]
    fn integer_attributes_use_the_integer_path() {
        let (mut gpu, _) = gpu();
        let buffer = GeometryBuffer::from_vertices(&mut gpu, &[[0u8; 8]; 2]).unwrap();
        let attrs = [
            VertexAttribute::new(0, 4, ComponentType::U8),
            VertexAttribute::new(1, 4, ComponentType::U8).normalized(),
        ];
        let layout = VertexLayout::describe(&mut gpu, &buffer, &attrs, None).unwrap();

        assert_eq!(gpu.driver().call_count("glVertexAttribIPointer"), 1);
        assert_eq!(gpu.driver().call_count("glVertexAttribPointer"), 1);
        let recorded = gpu.driver().attributes(layout.vao());
        assert!(recorded[0].integer);
        assert!(recorded[1].normalized && !recorded[1].integer);
        assert_eq!(layout.stride(), 8);
    }

    #[test]
    fn invalid_layout_creates_nothing() {
        let (mut gpu, _) = gpu();
        let buffer = GeometryBuffer::from_vertices(&mut gpu, &[0.0f32; 6]).unwrap();
        let err = VertexLayout::describe(&mut gpu, &buffer, &[VertexAttribute::f32(0, 3)], Some(8))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLayout(_)));
        assert_eq!(gpu.driver().created_count(ObjectKind::VertexArray), 0);
    }
}
