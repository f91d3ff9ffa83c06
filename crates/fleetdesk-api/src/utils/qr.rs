//! QR rendering for mobile upload links.

use base64::Engine;
use fleetdesk_core::AppError;
use qrcode::render::svg;
use qrcode::QrCode;

const QR_MIN_DIMENSION: u32 = 256;

/// Render `content` as an SVG QR code wrapped in a `data:` URL.
pub fn svg_data_url(content: &str) -> Result<String, AppError> {
    let code = QrCode::new(content.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to encode QR code: {}", e)))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(image)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_data_url() {
        let url = svg_data_url("https://desk.example.com/mobile-upload/car?token=abc").unwrap();
        let encoded = url
            .strip_prefix("data:image/svg+xml;base64,")
            .expect("data url prefix");
        let svg = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let svg = String::from_utf8(svg).unwrap();
        assert!(svg.contains("<svg"));
    }
}
