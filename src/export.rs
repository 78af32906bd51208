//! PNG export of a surface.

use std::path::Path;

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};

use crate::error::ExportError;
use crate::render::Surface;

pub const DEFAULT_FILE_NAME: &str = "roof.png";

/// Encodes exactly what the surface currently shows.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>, ExportError> {
    let img = surface.to_rgba_image();
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

pub fn save_png(surface: &Surface, path: &Path) -> Result<(), ExportError> {
    let bytes = encode_png(surface)?;
    std::fs::write(path, &bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "exported {}x{} surface to {}",
        surface.width(),
        surface.height(),
        path.display()
    );
    Ok(())
}
