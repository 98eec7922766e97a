//! Media type helpers for generated images.

/// Fallback when neither the provider nor the bytes identify the type.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// File extension for a MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        _ => "bin",
    }
}

/// Identify an image type from its magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

/// Pick the MIME type for an image: declared type if it is an image type,
/// otherwise sniffed, otherwise PNG.
pub fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> String {
    declared
        .map(str::trim)
        .filter(|m| m.to_ascii_lowercase().starts_with("image/"))
        .map(str::to_string)
        .or_else(|| sniff_image_mime(bytes).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}
