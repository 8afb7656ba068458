use crate::error::ContextError;

/// Window + context provider driven by the frame loop.
///
/// Calls happen on the context thread, once per frame, in this order:
/// `should_close`, `framebuffer_size`, (rendering), `present_frame`,
/// `poll_events`. A frame with an empty framebuffer skips rendering and
/// presenting and calls `wait_events` instead.
pub trait GraphicsContext {
    /// Checked between frames; `true` ends the loop.
    fn should_close(&self) -> bool;

    /// Framebuffer size in physical pixels. Zero in either dimension means
    /// there is nothing to draw into (e.g. minimized).
    fn framebuffer_size(&self) -> (u32, u32);

    /// Swaps buffers. May block on vsync.
    fn present_frame(&mut self) -> Result<(), ContextError>;

    /// Processes pending window events.
    fn poll_events(&mut self);

    /// Blocks until events arrive (or a short timeout passes), then processes
    /// them. Used while there is nothing to present.
    fn wait_events(&mut self);
}
