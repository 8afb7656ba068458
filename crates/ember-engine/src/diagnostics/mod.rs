//! Driver diagnostics.
//!
//! Every state-changing driver call goes through `Diagnostics::guard`, which
//! clears the error queue before the call and drains it afterwards. Each
//! pending code becomes a `Diagnostic` delivered to a `DiagnosticSink`; the
//! `ErrorPolicy` decides whether the caller keeps going or receives the error.
//!
//! The diagnostics context is an explicit value owned by `device::Gpu` so tests
//! can swap in a `MemorySink` and assert on what was reported.

mod layer;
mod record;
mod sink;

pub use layer::{Diagnostics, ErrorPolicy, Guarded};
pub use record::Diagnostic;
pub use sink::{DiagnosticSink, LogSink, MemorySink};
