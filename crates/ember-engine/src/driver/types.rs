use std::fmt;
use std::num::NonZeroU32;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// Raw driver name of the object.
            #[inline]
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

handle!(
    /// Driver-side shader (stage) object.
    ShaderId
);
handle!(
    /// Driver-side program object.
    ProgramId
);
handle!(
    /// Driver-side buffer object.
    BufferId
);
handle!(
    /// Driver-side vertex-array object.
    VertexArrayId
);
handle!(
    /// Driver-side texture object.
    TextureId
);

/// Resolved uniform binding location inside a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// Numeric error codes reported by the driver's error queue.
///
/// Values match the OpenGL enumerants so they can be passed through untouched.
pub mod error_code {
    pub const NO_ERROR: u32 = 0;
    pub const INVALID_ENUM: u32 = 0x0500;
    pub const INVALID_VALUE: u32 = 0x0501;
    pub const INVALID_OPERATION: u32 = 0x0502;
    pub const STACK_OVERFLOW: u32 = 0x0503;
    pub const STACK_UNDERFLOW: u32 = 0x0504;
    pub const OUT_OF_MEMORY: u32 = 0x0505;
    pub const INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;

    /// Symbolic name for `code`, if it is one of the standard codes.
    pub fn name(code: u32) -> Option<&'static str> {
        Some(match code {
            NO_ERROR => "GL_NO_ERROR",
            INVALID_ENUM => "GL_INVALID_ENUM",
            INVALID_VALUE => "GL_INVALID_VALUE",
            INVALID_OPERATION => "GL_INVALID_OPERATION",
            STACK_OVERFLOW => "GL_STACK_OVERFLOW",
            STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
            OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
            INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
            _ => return None,
        })
    }
}

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buffer binding points used by the pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Index data; binding is stored in the active vertex array.
    ElementArray,
}

/// Usage hint passed along with buffer uploads.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

/// Scalar type of one vertex attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    F32,
    I32,
    U32,
    I16,
    U16,
    I8,
    U8,
}

impl ComponentType {
    /// Size of one component in bytes.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::F32 | ComponentType::I32 | ComponentType::U32 => 4,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::I8 | ComponentType::U8 => 1,
        }
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        !matches!(self, ComponentType::F32)
    }
}

/// Primitive assembly mode for draw calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PrimitiveMode {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    Points,
}

/// Buffers affected by a clear.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR: ClearMask = ClearMask {
        color: true,
        depth: false,
    };
    pub const COLOR_DEPTH: ClearMask = ClearMask {
        color: true,
        depth: true,
    };
}

/// Server-side capabilities toggled by the pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Capability {
    DepthTest,
    Blend,
    CullFace,
}

/// Channel layout of uploaded 8-bit texel data.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Format for a decoded image with `channels` 8-bit channels.
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::R8),
            2 => Some(PixelFormat::Rg8),
            3 => Some(PixelFormat::Rgb8),
            4 => Some(PixelFormat::Rgba8),
            _ => None,
        }
    }

    #[inline]
    pub const fn channels(self) -> u32 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Sampler state applied to a texture at creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SamplerParams {
    pub linear: bool,
    pub clamp_to_edge: bool,
    pub mipmaps: bool,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            linear: true,
            clamp_to_edge: true,
            mipmaps: true,
        }
    }
}
