//! Ember studio: runs one of the demo scenes in a window.
//!
//! Usage: `ember-studio [quad|cube|textured] [image-path] [--headless[=FRAMES]] [--strict] [--no-vsync]`

mod scenes;
mod window;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use ember_engine::core::HeadlessContext;
use ember_engine::device::Gpu;
use ember_engine::diagnostics::{Diagnostics, ErrorPolicy};
use ember_engine::driver::{GlowDriver, RecordingDriver};
use ember_engine::logging::{LoggingConfig, init_logging};

use scenes::SceneKind;
use window::{GlWindow, WindowConfig};

const DEFAULT_HEADLESS_FRAMES: u64 = 120;

#[derive(Debug, Default)]
struct Options {
    scene: SceneKind,
    image: Option<PathBuf>,
    /// Run this many frames against the recording driver instead of a window.
    headless: Option<u64>,
    strict: bool,
    no_vsync: bool,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        let mut positional = 0;

        for arg in args {
            if arg == "--strict" {
                options.strict = true;
            } else if arg == "--no-vsync" {
                options.no_vsync = true;
            } else if arg == "--headless" {
                options.headless = Some(DEFAULT_HEADLESS_FRAMES);
            } else if let Some(frames) = arg.strip_prefix("--headless=") {
                let frames = frames
                    .parse()
                    .with_context(|| format!("invalid frame count `{frames}`"))?;
                options.headless = Some(frames);
            } else if arg.starts_with("--") {
                bail!("unknown option `{arg}`");
            } else {
                match positional {
                    0 => options.scene = arg.parse()?,
                    1 => options.image = Some(PathBuf::from(arg)),
                    _ => bail!("unexpected argument `{arg}`"),
                }
                positional += 1;
            }
        }
        Ok(options)
    }

    fn policy(&self) -> ErrorPolicy {
        if self.strict {
            ErrorPolicy::AbortOnError
        } else {
            ErrorPolicy::LogAndContinue
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let options = Options::parse(std::env::args().skip(1))?;
    log::info!("scene: {} (policy: {:?})", options.scene, options.policy());

    match options.headless {
        Some(frames) => run_headless(&options, frames),
        None => run_windowed(&options),
    }
}

fn run_windowed(options: &Options) -> Result<()> {
    let config = WindowConfig::default()
        .title(format!("ember · {}", options.scene))
        .vsync(!options.no_vsync);
    let (mut window, gl) = GlWindow::open(config)?;

    // SAFETY: `GlWindow::open` made the context current on this thread and
    // `window` keeps it alive until after `gpu` is dropped.
    let driver = unsafe { GlowDriver::new(gl) };
    let mut gpu = Gpu::new(driver, Diagnostics::new(options.policy()));

    let renderer = scenes::build(&mut gpu, options.scene, options.image.as_deref())?;
    let summary = renderer
        .run(&mut gpu, &mut window)
        .context("render loop failed")?;

    log::info!(
        "closed after {} frame(s), {:.1} fps average",
        summary.frames,
        summary.frames as f32 / summary.elapsed.max(f32::EPSILON)
    );
    Ok(())
}

fn run_headless(options: &Options, frames: u64) -> Result<()> {
    let mut gpu = Gpu::new(RecordingDriver::new(), Diagnostics::new(options.policy()));
    let mut context = HeadlessContext::new(800, 600, frames);

    let renderer = scenes::build(&mut gpu, options.scene, options.image.as_deref())?;
    let summary = renderer
        .run(&mut gpu, &mut context)
        .context("headless render loop failed")?;

    let gl = gpu.driver();
    log::info!(
        "headless run: {} frame(s), {} draw call(s), {} diagnostic(s)",
        summary.frames,
        gl.draws().len(),
        gpu.diagnostics().reported()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        Options::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_the_quad_scene() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.scene, SceneKind::Quad);
        assert!(options.image.is_none());
        assert_eq!(options.policy(), ErrorPolicy::LogAndContinue);
    }

    #[test]
    fn scene_image_and_flags() {
        let options = parse(&["textured", "wall.png", "--headless=10", "--strict"]).unwrap();
        assert_eq!(options.scene, SceneKind::Textured);
        assert_eq!(options.image, Some(PathBuf::from("wall.png")));
        assert_eq!(options.headless, Some(10));
        assert_eq!(options.policy(), ErrorPolicy::AbortOnError);
        assert!(!options.no_vsync);
        assert!(parse(&["--no-vsync"]).unwrap().no_vsync);
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse(&["sphere"]).is_err());
        assert!(parse(&["--fast"]).is_err());
        assert!(parse(&["quad", "a.png", "extra"]).is_err());
        assert!(parse(&["--headless=lots"]).is_err());
    }

    #[test]
    fn headless_run_completes() {
        let options = parse(&["cube", "--strict"]).unwrap();
        run_headless(&options, 5).unwrap();
    }
}
