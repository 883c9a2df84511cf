//! Token artifacts: Code 128 barcode and QR code rendered to PNG

use barcoders::sym::code128::Code128;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

use crate::config::ArtifactConfig;
use crate::error::{AppError, AppResult};

/// Code 128 character-set B prefix understood by barcoders
const CODE128_SET_B: char = '\u{0181}';

/// Blank modules on each side of the barcode
const QUIET_ZONE_MODULES: u32 = 10;

/// PNG images printed on a token
#[derive(Debug, Clone)]
pub struct TokenArtifacts {
    pub barcode_png: Vec<u8>,
    pub qr_png: Vec<u8>,
}

pub fn render_token_artifacts(code: &str, config: &ArtifactConfig) -> AppResult<TokenArtifacts> {
    Ok(TokenArtifacts {
        barcode_png: render_barcode_png(code, config)?,
        qr_png: render_qr_png(code, config)?,
    })
}

/// Render `code` as a Code 128 (set B) barcode
pub fn render_barcode_png(code: &str, config: &ArtifactConfig) -> AppResult<Vec<u8>> {
    let modules = Code128::new(format!("{}{}", CODE128_SET_B, code))
        .map_err(|e| AppError::Artifact(format!("barcode: {}", e)))?
        .encode();

    let module_width = config.barcode_module_width.max(1);
    let height = config.barcode_height.max(1);
    let total_modules = modules.len() as u32 + 2 * QUIET_ZONE_MODULES;

    let mut img = GrayImage::from_pixel(total_modules * module_width, height, Luma([255u8]));
    for (i, module) in modules.iter().enumerate() {
        if *module == 0 {
            continue;
        }
        let x0 = (QUIET_ZONE_MODULES + i as u32) * module_width;
        for x in x0..x0 + module_width {
            for y in 0..height {
                img.put_pixel(x, y, Luma([0u8]));
            }
        }
    }

    encode_png(DynamicImage::ImageLuma8(img))
}

/// Render `code` as a QR code
pub fn render_qr_png(code: &str, config: &ArtifactConfig) -> AppResult<Vec<u8>> {
    let qr = QrCode::new(code.as_bytes()).map_err(|e| AppError::Artifact(format!("qr: {}", e)))?;
    let size = config.qr_module_size.max(1);
    let img = qr
        .render::<Luma<u8>>()
        .module_dimensions(size, size)
        .build();

    encode_png(DynamicImage::ImageLuma8(img))
}

fn encode_png(img: DynamicImage) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| AppError::Artifact(format!("png: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn config() -> ArtifactConfig {
        ArtifactConfig {
            barcode_height: 40,
            barcode_module_width: 2,
            qr_module_size: 4,
        }
    }

    #[test]
    fn renders_png_images() {
        let artifacts = render_token_artifacts("AB12CD34", &config()).unwrap();
        assert!(artifacts.barcode_png.starts_with(&PNG_SIGNATURE));
        assert!(artifacts.qr_png.starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn barcode_width_follows_module_count() {
        let png = render_barcode_png("AB12CD34", &config()).unwrap();
        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!(img.height(), 40);
        assert_eq!(img.width() % 2, 0);
    }
}
