//! Upload validation and storage key construction.

use image::ImageFormat;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::DbId;

/// Default maximum upload size (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
];

/// Entities an upload can be attached to.
pub const UPLOAD_ENTITY_TYPES: &[&str] = &[
    "property",
    "unit",
    "inspection",
    "job",
    "service_request",
    "blog_post",
    "user",
];

const MAX_FILE_NAME_LENGTH: usize = 120;

/// Detect the real content type from the leading bytes.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Validate size and type. Returns the sniffed content type.
///
/// A declared type of `application/octet-stream` (or none) defers to the
/// sniffed type; any other declared type must agree with it.
pub fn validate_upload(
    bytes: &[u8],
    declared: Option<&str>,
    max_bytes: usize,
) -> Result<&'static str, UploadRejection> {
    if bytes.is_empty() {
        return Err(UploadRejection::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(UploadRejection::TooLarge { max_bytes });
    }
    let sniffed = sniff_content_type(bytes).ok_or(UploadRejection::UnsupportedType)?;

    let declared = declared
        .map(|d| d.split(';').next().unwrap_or(d).trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");
    match declared {
        Some(d) if d == sniffed || (d == "image/jpg" && sniffed == "image/jpeg") => Ok(sniffed),
        Some(_) => Err(UploadRejection::TypeMismatch { sniffed }),
        None => Ok(sniffed),
    }
}

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("File is empty")]
    Empty,
    #[error("File exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },
    #[error("Unsupported file type; allowed: JPEG, PNG, WebP, GIF, PDF")]
    UnsupportedType,
    #[error("Declared content type does not match file contents ({sniffed})")]
    TypeMismatch { sniffed: &'static str },
}

pub fn validate_entity_type(entity_type: &str) -> Result<(), CoreError> {
    if UPLOAD_ENTITY_TYPES.contains(&entity_type) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid entity_type '{entity_type}'"
        )))
    }
}

/// Reduce a client file name to `[A-Za-z0-9._-]`, keeping the extension.
pub fn sanitize_file_name(name: &str) -> String {
    // Strip any directory part a browser may send.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut out = String::with_capacity(base.len());
    let mut last_dash = false;
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    let trimmed = out.trim_matches(|c| c == '-' || c == '.');
    let mut cleaned: String = trimmed.to_string();
    if cleaned.is_empty() {
        cleaned = "file".to_string();
    }
    if cleaned.len() > MAX_FILE_NAME_LENGTH {
        let ext = cleaned
            .rfind('.')
            .map(|i| cleaned[i..].to_string())
            .filter(|e| e.len() <= 10)
            .unwrap_or_default();
        let keep = MAX_FILE_NAME_LENGTH - ext.len();
        cleaned = format!("{}{ext}", &cleaned[..keep]);
    }
    cleaned
}

/// `"{entity_type}/{entity_id}/{uuid}-{sanitized name}"`.
pub fn build_storage_key(entity_type: &str, entity_id: DbId, file_name: &str, id: Uuid) -> String {
    format!(
        "{entity_type}/{entity_id}/{id}-{}",
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(sniff_content_type(PNG_HEADER), Some("image/png"));
        assert_eq!(sniff_content_type(JPEG_HEADER), Some("image/jpeg"));
        assert_eq!(sniff_content_type(b"%PDF-1.7\n..."), Some("application/pdf"));
        assert_eq!(sniff_content_type(b"GIF89a......"), Some("image/gif"));
        assert_eq!(sniff_content_type(b"hello world"), None);
    }

    #[test]
    fn validate_accepts_matching_or_generic_declared_type() {
        assert_eq!(validate_upload(PNG_HEADER, Some("image/png"), 1024), Ok("image/png"));
        assert_eq!(
            validate_upload(PNG_HEADER, Some("application/octet-stream"), 1024),
            Ok("image/png")
        );
        assert_eq!(validate_upload(JPEG_HEADER, Some("image/jpg"), 1024), Ok("image/jpeg"));
        assert_eq!(validate_upload(PNG_HEADER, None, 1024), Ok("image/png"));
    }

    #[test]
    fn validate_rejects_bad_uploads() {
        assert_eq!(validate_upload(b"", None, 1024), Err(UploadRejection::Empty));
        assert_matches!(
            validate_upload(PNG_HEADER, None, 4),
            Err(UploadRejection::TooLarge { max_bytes: 4 })
        );
        assert_eq!(
            validate_upload(b"#!/bin/sh\necho", Some("image/png"), 1024),
            Err(UploadRejection::UnsupportedType)
        );
        assert_matches!(
            validate_upload(PNG_HEADER, Some("application/pdf"), 1024),
            Err(UploadRejection::TypeMismatch { sniffed: "image/png" })
        );
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("My Photo (1).JPG"), "My-Photo-1-.JPG");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\plan.pdf"), "plan.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
        let long = format!("{}.png", "a".repeat(300));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), MAX_FILE_NAME_LENGTH);
        assert!(cleaned.ends_with(".png"));
    }

    #[test]
    fn storage_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            build_storage_key("property", 42, "front door.png", id),
            "property/42/00000000-0000-0000-0000-000000000000-front-door.png"
        );
    }

    #[test]
    fn entity_types() {
        assert!(validate_entity_type("service_request").is_ok());
        assert!(validate_entity_type("invoice").is_err());
    }
}
