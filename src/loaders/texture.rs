use super::fetch::{fetch, Source};
use crate::error::LoadError;
use crate::scene::{TextureImage, TextureSlot};

/// Fetch and decode a 2D texture for `slot`
pub fn load_texture(url: &str, slot: TextureSlot, progress: &mut dyn FnMut(f32)) -> Result<TextureImage, LoadError> {
    let source = Source::parse(url)?;
    let bytes = fetch(&source, progress)?;
    decode_texture(&bytes, slot, url)
}

pub fn decode_texture(bytes: &[u8], slot: TextureSlot, url: &str) -> Result<TextureImage, LoadError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| LoadError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    log::debug!("{}: {}x{} {:?} texture", url, width, height, slot);

    Ok(TextureImage::new(width, height, image.into_raw(), slot.color_space()))
}
