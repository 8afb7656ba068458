use crate::error::ContextError;

use super::GraphicsContext;

/// A context without a window that closes after a fixed number of frames.
///
/// Frames skipped for an empty framebuffer count toward the limit, so a
/// zero-sized context still closes.
#[derive(Debug, Clone)]
pub struct HeadlessContext {
    size: (u32, u32),
    frame_limit: u64,
    presented: u64,
    skipped: u64,
}

impl HeadlessContext {
    pub fn new(width: u32, height: u32, frame_limit: u64) -> Self {
        Self {
            size: (width, height),
            frame_limit,
            presented: 0,
            skipped: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Frames that waited instead of presenting.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}

impl GraphicsContext for HeadlessContext {
    fn should_close(&self) -> bool {
        self.presented + self.skipped >= self.frame_limit
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn present_frame(&mut self) -> Result<(), ContextError> {
        self.presented += 1;
        Ok(())
    }

    fn poll_events(&mut self) {}

    fn wait_events(&mut self) {
        self.skipped += 1;
    }
}
