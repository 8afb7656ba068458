use std::collections::BTreeMap;

use glam::Mat4;

use crate::device::Gpu;
use crate::driver::{Driver, ProgramId, UniformLocation};
use crate::error::{DriverError, EngineError, Result};

use super::{ShaderSource, build_program};

/// A linked program plus its lazily filled uniform cache.
///
/// Only `link_program` creates values of this type, so holding one means the
/// link succeeded. The owner deletes it with `release`.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    validated: bool,
    /// Name → location; `None` records a lookup the driver answered with "absent".
    uniforms: BTreeMap<String, Option<UniformLocation>>,
}

impl ShaderProgram {
    pub(crate) fn new(id: ProgramId, validated: bool) -> Self {
        Self {
            id,
            validated,
            uniforms: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Outcome of the advisory validation run after linking.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Makes this the active program.
    pub fn bind<D: Driver>(&self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let id = self.id;
        gpu.call("glUseProgram", |gl| gl.use_program(Some(id)))
    }

    /// Looks up a uniform location by name.
    ///
    /// The first lookup of a name asks the driver; later ones are answered from
    /// the cache, including negative answers.
    pub fn resolve_uniform<D: Driver>(
        &mut self,
        gpu: &mut Gpu<D>,
        name: &str,
    ) -> Result<UniformLocation> {
        let location = match self.uniforms.get(name) {
            Some(cached) => *cached,
            None => {
                let id = self.id;
                let resolved =
                    gpu.call("glGetUniformLocation", |gl| gl.uniform_location(id, name))?;
                self.uniforms.insert(name.to_string(), resolved);
                resolved
            }
        };
        location.ok_or_else(|| EngineError::UniformNotFound {
            name: name.to_string(),
        })
    }

    /// Cached lookups in name order.
    pub fn cached_uniforms(&self) -> impl Iterator<Item = (&str, Option<UniformLocation>)> {
        self.uniforms.iter().map(|(name, loc)| (name.as_str(), *loc))
    }

    /// Uploads a 4×4 matrix; returns `false` when the uniform does not exist.
    pub fn set_mat4<D: Driver>(
        &mut self,
        gpu: &mut Gpu<D>,
        name: &str,
        value: &Mat4,
    ) -> Result<bool> {
        let columns = value.to_cols_array();
        self.upload(gpu, name, "glUniformMatrix4fv", |gl, loc| {
            gl.uniform_mat4(loc, &columns)
        })
    }

    pub fn set_i32<D: Driver>(&mut self, gpu: &mut Gpu<D>, name: &str, value: i32) -> Result<bool> {
        self.upload(gpu, name, "glUniform1i", |gl, loc| gl.uniform_i32(loc, value))
    }

    pub fn set_f32<D: Driver>(&mut self, gpu: &mut Gpu<D>, name: &str, value: f32) -> Result<bool> {
        self.upload(gpu, name, "glUniform1f", |gl, loc| gl.uniform_f32(loc, value))
    }

    fn upload<D: Driver>(
        &mut self,
        gpu: &mut Gpu<D>,
        name: &str,
        call: &str,
        f: impl FnOnce(&mut D, UniformLocation),
    ) -> Result<bool> {
        match self.resolve_uniform(gpu, name) {
            Ok(loc) => {
                gpu.call(call, |gl| f(gl, loc))?;
                Ok(true)
            }
            Err(EngineError::UniformNotFound { .. }) => {
                log::trace!("uniform `{name}` not active in program {}; skipped", self.id.get());
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Rebuilds the program from new sources.
    ///
    /// On success the old program is deleted and the uniform cache starts
    /// empty. On failure `self` is untouched and still usable.
    pub fn rebuild<D: Driver>(
        &mut self,
        gpu: &mut Gpu<D>,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<()> {
        let fresh = build_program(gpu, vertex, fragment)?;
        let old = std::mem::replace(self, fresh);
        log::debug!("program {} replaced by {}", old.id.get(), self.id.get());
        old.release(gpu)?;
        Ok(())
    }

    /// Deletes the program object.
    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        super::builder::delete_program(gpu, self.id)
    }
}
