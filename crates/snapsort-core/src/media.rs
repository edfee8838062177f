//! Media type detection and filename helpers.
//!
//! Detection order when no usable type is declared:
//! 1. Magic bytes via `infer`
//! 2. Filename extension
//! 3. `image/jpeg`

/// Type assumed when nothing else identifies an image.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// Resolve the media type for an uploaded payload.
///
/// A declared type is trusted unless it is empty or the generic
/// `application/octet-stream`.
pub fn detect_media_type(filename: Option<&str>, data: &[u8], declared: Option<&str>) -> String {
    if let Some(declared) = declared.map(str::trim) {
        if is_valid_mime_type(declared) && declared != "application/octet-stream" {
            return declared.to_lowercase();
        }
    }

    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some(mime) = filename.and_then(extension_of).and_then(mime_from_extension) {
        return mime.to_string();
    }

    DEFAULT_IMAGE_TYPE.to_string()
}

/// True for the HEIC/HEIF family, judged by media type or filename.
pub fn is_heic(media_type: &str, filename: Option<&str>) -> bool {
    let media_type = media_type.to_lowercase();
    if matches!(
        media_type.as_str(),
        "image/heic" | "image/heif" | "image/heic-sequence" | "image/heif-sequence"
    ) {
        return true;
    }
    matches!(
        filename.and_then(extension_of).map(|e| e.to_lowercase()).as_deref(),
        Some("heic") | Some("heif")
    )
}

/// Preferred file extension for an image media type.
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Replace the extension of `filename` (or append one).
pub fn with_extension(filename: &str, ext: &str) -> String {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{}", &filename[..dot], ext),
        _ => format!("{}.{}", filename, ext),
    }
}

const MAX_FILENAME_CHARS: usize = 200;
/// Longer dotted suffixes are treated as part of the stem.
const MAX_EXTENSION_CHARS: usize = 16;

/// Sanitize one archive path segment (folder or file name).
///
/// Strips path components and characters that are unsafe in common
/// filesystems; never returns an empty string.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim().trim_start_matches('.');
    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    // Truncate if too long, keeping a short extension
    if sanitized.chars().count() > MAX_FILENAME_CHARS {
        let ext = sanitized
            .rfind('.')
            .map(|pos| &sanitized[pos..])
            .filter(|ext| ext.chars().count() <= MAX_EXTENSION_CHARS)
            .unwrap_or("");
        let stem: String = sanitized
            .chars()
            .take(MAX_FILENAME_CHARS - ext.chars().count())
            .collect();
        return format!("{}{}", stem, ext);
    }

    sanitized.to_string()
}

/// Validate MIME type format per RFC 2045 (type/subtype).
pub fn is_valid_mime_type(mime: &str) -> bool {
    let parts: Vec<&str> = mime.split('/').collect();
    if parts.len() != 2 {
        return false;
    }
    let (media_type, subtype) = (parts[0], parts[1]);
    if media_type.is_empty() || subtype.is_empty() {
        return false;
    }
    let is_token_char = |c: char| -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '!' | '#' | '$' | '&' | '-' | '^' | '_' | '.' | '+')
    };
    media_type.chars().all(is_token_char) && subtype.chars().all(is_token_char)
}

fn extension_of(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" | "jfif" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "avif" => Some("image/avif"),
        "svg" => Some("image/svg+xml"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}
