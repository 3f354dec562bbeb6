use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flashdrop_core::AppError;
use image::Luma;
use qrcode::QrCode;

/// Renders `url` as a QR code PNG and returns it as a
/// `data:image/png;base64,...` data URL, ready to drop into an `<img>` tag.
pub fn data_url(url: &str) -> Result<String, AppError> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| AppError::Internal(format!("failed to encode QR code: {}", e)))?;

    let img = code.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("failed to render QR code PNG: {}", e)))?;

    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_has_png_prefix() {
        let url = data_url("https://flashdrop.example.com/download/abc").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_data_url_payload_is_valid_base64_png() {
        let url = data_url("https://flashdrop.example.com/download/abc").unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        // PNG magic bytes.
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn test_distinct_urls_produce_distinct_codes() {
        let a = data_url("https://flashdrop.example.com/download/a").unwrap();
        let b = data_url("https://flashdrop.example.com/download/b").unwrap();
        assert_ne!(a, b);
    }
}
