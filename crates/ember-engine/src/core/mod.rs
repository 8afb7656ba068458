//! Contracts between the engine and its host.
//!
//! The host owns the window and the context; the engine only needs to know
//! when to stop, how big the framebuffer is, and how to present.

mod context;
mod headless;

pub use context::GraphicsContext;
pub use headless::HeadlessContext;
