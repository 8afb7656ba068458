//! Graphics device wrapper.
//!
//! `Gpu` pairs a `Driver` with the `Diagnostics` context. All pipeline code
//! issues driver calls through `Gpu::call`, which brackets them with error
//! checks and applies the configured policy.

mod gpu;

pub use gpu::Gpu;
