use crate::device::Gpu;
use crate::driver::{Driver, ProgramId, ShaderId, StageKind};
use crate::error::{DriverError, EngineError, Result};

use super::{ShaderProgram, ShaderSource};

/// A successfully compiled stage object, waiting to be linked.
///
/// Consumed by `link_program` (or `release`), so a stage object is freed
/// exactly once.
#[derive(Debug)]
#[must_use = "compiled stages must be linked or released"]
pub struct CompiledStage {
    kind: StageKind,
    id: ShaderId,
}

impl CompiledStage {
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    /// Deletes the stage object without linking it.
    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let id = self.id;
        gpu.call("glDeleteShader", |gl| gl.delete_shader(id))
    }
}

/// Compiles one stage.
///
/// Empty sources are rejected before the driver is touched. On a failed
/// compile the driver log is returned in `EngineError::Compile` and the stage
/// object is deleted.
pub fn compile_stage<D: Driver>(gpu: &mut Gpu<D>, source: &ShaderSource) -> Result<CompiledStage> {
    let kind = source.kind();
    if source.is_empty() {
        return Err(EngineError::Compile {
            stage: kind,
            log: "shader source is empty".to_string(),
        });
    }

    let id = gpu
        .call("glCreateShader", |gl| gl.create_shader(kind))?
        .map_err(|reason| EngineError::resource("shader object", reason))?;
    let stage = CompiledStage { kind, id };

    let compiled = match submit_and_compile(gpu, id, source.text()) {
        Ok(compiled) => compiled,
        Err(err) => {
            discard(stage.release(gpu));
            return Err(err.into());
        }
    };

    if !compiled {
        let log = gpu
            .call("glGetShaderInfoLog", |gl| gl.shader_info_log(id))
            .unwrap_or_default();
        discard(stage.release(gpu));
        return Err(EngineError::Compile {
            stage: kind,
            log: non_empty_log(log),
        });
    }

    log::debug!("{kind} shader compiled (object {})", id.get());
    Ok(stage)
}

/// Links a vertex and a fragment stage into a program.
///
/// Both stages are detached and deleted whatever the outcome. A link failure
/// deletes the program and returns its info log as `EngineError::Link`.
/// Validation runs after a successful link and only produces a warning.
pub fn link_program<D: Driver>(
    gpu: &mut Gpu<D>,
    vertex: CompiledStage,
    fragment: CompiledStage,
) -> Result<ShaderProgram> {
    if vertex.kind != StageKind::Vertex || fragment.kind != StageKind::Fragment {
        let log = format!(
            "expected vertex + fragment stages, got {} + {}",
            vertex.kind, fragment.kind
        );
        discard(vertex.release(gpu));
        discard(fragment.release(gpu));
        return Err(EngineError::Link { log });
    }

    let program = match gpu.call("glCreateProgram", |gl| gl.create_program()) {
        Ok(Ok(program)) => program,
        Ok(Err(reason)) => {
            discard(vertex.release(gpu));
            discard(fragment.release(gpu));
            return Err(EngineError::resource("program object", reason));
        }
        Err(err) => {
            discard(vertex.release(gpu));
            discard(fragment.release(gpu));
            return Err(err.into());
        }
    };

    let mut attached = Vec::with_capacity(2);
    let outcome = attach_and_link(gpu, program, [vertex.id, fragment.id], &mut attached);

    // Stage objects are no longer needed once the link has been attempted.
    for stage in [vertex, fragment] {
        let id = stage.id;
        if attached.contains(&id) {
            discard(gpu.call("glDetachShader", |gl| gl.detach_shader(program, id)));
        }
        discard(stage.release(gpu));
    }

    match outcome {
        Err(err) => {
            discard(delete_program(gpu, program));
            Err(err.into())
        }
        Ok(false) => {
            let log = gpu
                .call("glGetProgramInfoLog", |gl| gl.program_info_log(program))
                .unwrap_or_default();
            discard(delete_program(gpu, program));
            Err(EngineError::Link {
                log: non_empty_log(log),
            })
        }
        Ok(true) => {
            let validated = validate(gpu, program);
            log::debug!("program {} linked (validated: {validated})", program.get());
            Ok(ShaderProgram::new(program, validated))
        }
    }
}

/// Compiles both sources and links them.
///
/// If the fragment stage fails to compile, the already compiled vertex stage
/// is released before the error is returned.
pub fn build_program<D: Driver>(
    gpu: &mut Gpu<D>,
    vertex: &ShaderSource,
    fragment: &ShaderSource,
) -> Result<ShaderProgram> {
    let vs = compile_stage(gpu, vertex)?;
    let fs = match compile_stage(gpu, fragment) {
        Ok(fs) => fs,
        Err(err) => {
            discard(vs.release(gpu));
            return Err(err);
        }
    };
    link_program(gpu, vs, fs)
}

fn submit_and_compile<D: Driver>(
    gpu: &mut Gpu<D>,
    id: ShaderId,
    text: &str,
) -> Result<bool, DriverError> {
    gpu.call("glShaderSource", |gl| gl.shader_source(id, text))?;
    gpu.call("glCompileShader", |gl| gl.compile_shader(id))?;
    gpu.call("glGetShaderiv(GL_COMPILE_STATUS)", |gl| gl.compile_status(id))
}

fn attach_and_link<D: Driver>(
    gpu: &mut Gpu<D>,
    program: ProgramId,
    stages: [ShaderId; 2],
    attached: &mut Vec<ShaderId>,
) -> Result<bool, DriverError> {
    for id in stages {
        let clean = gpu.probe("glAttachShader", |gl| gl.attach_shader(program, id));
        if clean.is_clean() {
            attached.push(id);
        }
        gpu.diagnostics().settle(clean)?;
    }
    gpu.call("glLinkProgram", |gl| gl.link_program(program))?;
    gpu.call("glGetProgramiv(GL_LINK_STATUS)", |gl| gl.link_status(program))
}

/// Advisory validation; driver errors here never escalate.
fn validate<D: Driver>(gpu: &mut Gpu<D>, program: ProgramId) -> bool {
    let ran = gpu.probe("glValidateProgram", |gl| gl.validate_program(program));
    if !ran.is_clean() {
        return false;
    }
    let status = gpu.probe("glGetProgramiv(GL_VALIDATE_STATUS)", |gl| {
        gl.validate_status(program)
    });
    if status.is_clean() && status.value {
        return true;
    }
    let log = gpu
        .probe("glGetProgramInfoLog", |gl| gl.program_info_log(program))
        .value;
    log::warn!("program {} failed validation: {}", program.get(), non_empty_log(log));
    false
}

pub(super) fn delete_program<D: Driver>(
    gpu: &mut Gpu<D>,
    program: ProgramId,
) -> Result<(), DriverError> {
    gpu.call("glDeleteProgram", |gl| gl.delete_program(program))
}

fn non_empty_log(log: String) -> String {
    let trimmed = log.trim_end();
    if trimmed.is_empty() {
        "(driver returned no log)".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cleanup on an error path; the original error is what the caller gets.
fn discard(res: Result<(), DriverError>) {
    if let Err(err) = res {
        log::debug!("ignoring error during cleanup: {err}");
    }
}
