//! Ember engine crate.
//!
//! A minimal real-time rendering pipeline on top of an OpenGL-style driver:
//! shader programs built from source text, vertex/index data uploaded into
//! GPU buffers, and a per-frame renderer that draws them with animated
//! transforms. Every driver call is checked by the diagnostics layer.
//!
//! The crate never creates windows or contexts. Callers hand it a `Driver`
//! for a context that is already current, plus a `core::GraphicsContext` for
//! presenting frames.

pub mod core;
pub mod device;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod shader;
pub mod texture;
pub mod time;

pub use error::{EngineError, Result};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::device::Gpu;
    use crate::diagnostics::{Diagnostics, ErrorPolicy, MemorySink};
    use crate::driver::RecordingDriver;

    pub const BASIC_VS: &str = "#version 410 core
layout(location = 0) in vec3 a_Position;
uniform mat4 u_Model;
uniform mat4 u_View;
uniform mat4 u_Projection;
out vec3 v_Color;
void main() {
    v_Color = a_Position * 0.5 + 0.5;
    gl_Position = u_Projection * u_View * u_Model * vec4(a_Position, 1.0);
}
";

    pub const BASIC_FS: &str = "#version 410 core
in vec3 v_Color;
uniform float u_Time;
layout(location = 0) out vec4 o_Color;
void main() {
    o_Color = vec4(v_Color * (0.5 + 0.5 * sin(u_Time)), 1.0);
}
";

    fn with_policy(policy: ErrorPolicy) -> (Gpu<RecordingDriver>, MemorySink) {
        let sink = MemorySink::new();
        let diagnostics = Diagnostics::new(policy).with_sink(sink.clone());
        (Gpu::new(RecordingDriver::new(), diagnostics), sink)
    }

    /// Recording GPU with the default (continue) policy and captured diagnostics.
    pub fn gpu() -> (Gpu<RecordingDriver>, MemorySink) {
        with_policy(ErrorPolicy::LogAndContinue)
    }

    /// Recording GPU that escalates the first driver error.
    pub fn strict_gpu() -> (Gpu<RecordingDriver>, MemorySink) {
        with_policy(ErrorPolicy::AbortOnError)
    }
}
