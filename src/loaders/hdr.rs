use glam::Vec3;
use std::f32::consts::PI;

use super::fetch::{fetch, Source};
use crate::error::LoadError;
use crate::scene::EnvironmentMap;

/// Fetch and decode an equirectangular environment map
pub fn load_environment(url: &str, progress: &mut dyn FnMut(f32)) -> Result<EnvironmentMap, LoadError> {
    let source = Source::parse(url)?;
    let bytes = fetch(&source, progress)?;
    decode_environment(&bytes, url)
}

/// Decode Radiance HDR (or any format `image` understands) to linear RGBA32F
pub fn decode_environment(bytes: &[u8], url: &str) -> Result<EnvironmentMap, LoadError> {
    let image = image::load_from_memory(bytes).map_err(|e| LoadError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let rgb = image.to_rgb32f();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(LoadError::Decode {
            url: url.to_string(),
            reason: "empty image".to_string(),
        });
    }

    let texels: Vec<f32> = rgb
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2], 1.0])
        .collect();
    let ambient = mean_radiance(&texels, width, height);

    log::info!(
        "{}: {}x{} environment, ambient {:.3} {:.3} {:.3}",
        url,
        width,
        height,
        ambient.x,
        ambient.y,
        ambient.z
    );
    Ok(EnvironmentMap::new(width, height, texels, ambient))
}

/// Average radiance over the sphere. Equirectangular rows near the poles
/// cover less solid angle, so each row is weighted by cos(latitude).
pub fn mean_radiance(texels: &[f32], width: u32, height: u32) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut weight_sum = 0.0;

    for (y, row) in texels.chunks_exact(width as usize * 4).take(height as usize).enumerate() {
        let latitude = (0.5 - (y as f32 + 0.5) / height as f32) * PI;
        let weight = latitude.cos();
        let row_sum = row
            .chunks_exact(4)
            .fold(Vec3::ZERO, |acc, t| acc + Vec3::new(t[0], t[1], t[2]));
        sum += row_sum * weight;
        weight_sum += weight * width as f32;
    }

    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        Vec3::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_map_averages_to_its_value() {
        let texels: Vec<f32> = (0..8 * 4).flat_map(|_| [0.5, 1.0, 2.0, 1.0]).collect();
        let ambient = mean_radiance(&texels, 8, 4);
        assert!((ambient - Vec3::new(0.5, 1.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn equator_outweighs_poles() {
        // Bright top row, dark rest
        let mut texels = vec![0.0f32; 4 * 4 * 4];
        for t in texels.chunks_exact_mut(4).take(4) {
            t.copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        }
        let top_bright = mean_radiance(&texels, 4, 4);

        let mut texels = vec![0.0f32; 4 * 4 * 4];
        for t in texels.chunks_exact_mut(4).skip(4).take(4) {
            t.copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        }
        let near_equator_bright = mean_radiance(&texels, 4, 4);

        assert!(near_equator_bright.x > top_bright.x);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            decode_environment(b"#?RADIANCE\nbroken", "broken.hdr"),
            Err(LoadError::Decode { .. })
        ));
    }
}
