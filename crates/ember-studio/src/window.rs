//! Window and OpenGL context.
//!
//! The window is created through `winit` and the context through `glutin`.
//! Instead of handing control to `EventLoop::run_app`, the event loop is
//! pumped once per frame so the engine's frame loop stays in charge.

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use ember_engine::core::GraphicsContext;
use ember_engine::error::ContextError;
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow as _};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

/// How long `open` waits for the platform to deliver the first resume.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest block in `wait_events`; bounds how late a close request is seen.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub size: LogicalSize<f64>,
    /// Requested core-profile version.
    pub gl_version: (u8, u8),
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "ember".to_string(),
            size: LogicalSize::new(800.0, 600.0),
            gl_version: (4, 1),
            vsync: true,
        }
    }
}

impl WindowConfig {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn vsync(mut self, enabled: bool) -> Self {
        self.vsync = enabled;
        self
    }
}

/// Context objects kept alive for as long as the window is open.
///
/// Field order matters: the surface and context go before the window.
struct GlState {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

struct WindowState {
    config: WindowConfig,
    gl: Option<GlState>,
    startup_error: Option<anyhow::Error>,
    size: PhysicalSize<u32>,
    close_requested: bool,
}

impl WindowState {
    fn new(config: WindowConfig) -> Self {
        Self {
            config,
            gl: None,
            startup_error: None,
            size: PhysicalSize::new(0, 0),
            close_requested: false,
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        let Some(gl) = &self.gl else { return };
        // A zero dimension means minimized; keep the old surface size.
        if let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
            gl.surface.resize(&gl.context, w, h);
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl.is_some() || self.startup_error.is_some() {
            return;
        }
        match create_gl(event_loop, &self.config) {
            Ok(gl) => {
                self.size = gl.window.inner_size();
                self.gl = Some(gl);
            }
            Err(err) => {
                self.startup_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.close_requested = true,
            _ => {}
        }
    }
}

fn create_gl(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<GlState> {
    let attrs = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(config.size);

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(24);

    let (window, gl_config) = DisplayBuilder::new()
        .with_window_attributes(Some(attrs))
        .build(event_loop, template, pick_config)
        .map_err(|e| anyhow!("failed to create window and GL display: {e}"))?;
    let window = window.context("display builder returned no window")?;

    let raw_handle = window
        .window_handle()
        .context("window has no native handle")?
        .as_raw();
    let (major, minor) = config.gl_version;
    let context_attrs = ContextAttributesBuilder::new()
        .with_profile(GlProfile::Core)
        .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
        .build(Some(raw_handle));

    let display = gl_config.display();
    let not_current = unsafe { display.create_context(&gl_config, &context_attrs) }
        .with_context(|| format!("failed to create an OpenGL {major}.{minor} core context"))?;

    let surface_attrs = window
        .build_surface_attributes(Default::default())
        .context("failed to describe the window surface")?;
    let surface = unsafe { display.create_window_surface(&gl_config, &surface_attrs) }
        .context("failed to create the window surface")?;
    let context = not_current
        .make_current(&surface)
        .context("failed to make the GL context current")?;

    let interval = if config.vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(err) = surface.set_swap_interval(&context, interval) {
        log::warn!("could not set swap interval {interval:?}: {err}");
    }

    log::info!(
        "window `{}` opened ({} samples, depth {})",
        config.title,
        gl_config.num_samples(),
        gl_config.depth_size()
    );
    Ok(GlState {
        surface,
        context,
        window,
    })
}

/// Prefers the config with the most multisampling.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, next| {
            if next.num_samples() > best.num_samples() {
                next
            } else {
                best
            }
        })
        // glutin reports an error before calling the picker when nothing matches.
        .expect("display offered no GL configs")
}

/// A window with a current OpenGL context.
pub struct GlWindow {
    event_loop: EventLoop<()>,
    state: WindowState,
    exited: bool,
}

impl GlWindow {
    /// Opens the window and returns it with a loaded `glow` context.
    pub fn open(config: WindowConfig) -> Result<(Self, glow::Context)> {
        let mut event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = WindowState::new(config);

        // Window creation happens on the first resume; wait for it.
        let started = Instant::now();
        while state.gl.is_none() && state.startup_error.is_none() {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::from_millis(16)), &mut state)
            {
                if state.startup_error.is_none() {
                    return Err(anyhow!("event loop exited during startup (code {code})"));
                }
                break;
            }
            if started.elapsed() > STARTUP_TIMEOUT {
                return Err(anyhow!("window was not created within {STARTUP_TIMEOUT:?}"));
            }
        }
        if let Some(err) = state.startup_error.take() {
            return Err(err);
        }
        let gl_state = state.gl.as_ref().context("window was not created")?;

        let display = gl_state.surface.display();
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name))
        };

        Ok((
            Self {
                event_loop,
                state,
                exited: false,
            },
            gl,
        ))
    }
}

impl GraphicsContext for GlWindow {
    fn should_close(&self) -> bool {
        self.exited || self.state.close_requested
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (self.state.size.width, self.state.size.height)
    }

    fn present_frame(&mut self) -> Result<(), ContextError> {
        let gl = self
            .state
            .gl
            .as_ref()
            .ok_or_else(|| ContextError::new("window is gone"))?;
        gl.window.pre_present_notify();
        gl.surface
            .swap_buffers(&gl.context)
            .map_err(|e| ContextError::new(format!("swap_buffers failed: {e}")))
    }

    fn poll_events(&mut self) {
        self.pump(Duration::ZERO);
    }

    fn wait_events(&mut self) {
        self.pump(IDLE_WAIT);
    }
}

impl GlWindow {
    fn pump(&mut self, timeout: Duration) {
        let status = self.event_loop.pump_app_events(Some(timeout), &mut self.state);
        if let PumpStatus::Exit(code) = status {
            log::debug!("event loop exited with code {code}");
            self.exited = true;
        }
    }
}
