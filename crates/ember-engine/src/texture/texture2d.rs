use crate::device::Gpu;
use crate::driver::{Driver, PixelFormat, SamplerParams, TextureId};
use crate::error::{DriverError, EngineError, Result};

use super::DecodedImage;

/// A sampled 2D texture assigned to one texture unit.
#[derive(Debug)]
pub struct Texture2d {
    id: TextureId,
    unit: u32,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Texture2d {
    /// Uploads `image` with linear filtering, edge clamping and mipmaps, and
    /// leaves it bound to `unit`.
    pub fn upload<D: Driver>(gpu: &mut Gpu<D>, image: &DecodedImage, unit: u32) -> Result<Self> {
        Self::upload_with(gpu, image, unit, SamplerParams::default())
    }

    pub fn upload_with<D: Driver>(
        gpu: &mut Gpu<D>,
        image: &DecodedImage,
        unit: u32,
        sampler: SamplerParams,
    ) -> Result<Self> {
        image.validate()?;
        let format = PixelFormat::from_channels(image.channels).ok_or_else(|| {
            let reason = format!("unsupported channel count {}", image.channels);
            EngineError::resource("texture", reason)
        })?;

        let id = gpu
            .call("glGenTextures", |gl| gl.create_texture())?
            .map_err(|reason| EngineError::resource("texture", reason))?;
        let texture = Self {
            id,
            unit,
            width: image.width,
            height: image.height,
            format,
        };

        if let Err(err) = texture.fill(gpu, image, sampler) {
            let _ = texture.release(gpu);
            return Err(err.into());
        }

        log::debug!(
            "texture {} uploaded ({}x{} {format:?}) on unit {unit}",
            id.get(),
            image.width,
            image.height
        );
        Ok(texture)
    }

    fn fill<D: Driver>(
        &self,
        gpu: &mut Gpu<D>,
        image: &DecodedImage,
        sampler: SamplerParams,
    ) -> Result<(), DriverError> {
        let (w, h, format) = (self.width, self.height, self.format);
        self.bind(gpu)?;
        gpu.call("glTexImage2D", |gl| gl.tex_image_2d(w, h, format, &image.pixels))?;
        gpu.call("glTexParameteri", |gl| gl.tex_parameters(sampler))?;
        if sampler.mipmaps {
            gpu.call("glGenerateMipmap", |gl| gl.generate_mipmap())?;
        }
        Ok(())
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Activates the texture's unit and binds it there.
    pub fn bind<D: Driver>(&self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let (id, unit) = (self.id, self.unit);
        gpu.call("glActiveTexture", |gl| gl.active_texture(unit))?;
        gpu.call("glBindTexture(GL_TEXTURE_2D)", |gl| gl.bind_texture(Some(id)))
    }

    pub fn release<D: Driver>(self, gpu: &mut Gpu<D>) -> Result<(), DriverError> {
        let id = self.id;
        gpu.call("glDeleteTextures", |gl| gl.delete_texture(id))
    }
}
