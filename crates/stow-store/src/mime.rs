//! Mime type helpers.

/// Fallback content type for unknown payloads.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type of converted images.
pub const WEBP: &str = "image/webp";

const PNG: &[&str] = &["image/png", "application/png", "application/x-png"];
const JPEG: &[&str] = &[
    "image/jpg",
    "application/jpg",
    "application/x-jpg",
    "image/jpeg",
    "application/jpeg",
];
const OTHER_IMAGES: &[&str] = &["image/gif", "image/bmp", WEBP];

/// Guess a mime type from a file name's extension.
pub fn guess(name: &str) -> Option<String> {
    if name.to_ascii_lowercase().ends_with(".webp") {
        return Some(WEBP.to_string());
    }
    mime_guess::from_path(name).first_raw().map(str::to_string)
}

/// Declared type if any, else a guess from the name, else octet-stream.
pub fn resolve(name: &str, declared: Option<&str>) -> String {
    declared
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .or_else(|| guess(name))
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Whether a content type is one of the recognized image types.
pub fn is_image(content_type: &str) -> bool {
    PNG.iter()
        .chain(JPEG)
        .chain(OTHER_IMAGES)
        .any(|t| t.eq_ignore_ascii_case(content_type))
}

/// Whether an image of this type should be converted to webp.
pub fn is_convertible_image(content_type: &str) -> bool {
    is_image(content_type) && !content_type.eq_ignore_ascii_case(WEBP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_common_types() {
        assert_eq!(guess("test.txt").as_deref(), Some("text/plain"));
        assert_eq!(guess("test.html").as_deref(), Some("text/html"));
        assert_eq!(guess("test.json").as_deref(), Some("application/json"));
        assert_eq!(guess("report.pdf").as_deref(), Some("application/pdf"));
        assert_eq!(guess("photo.WEBP").as_deref(), Some(WEBP));
        assert_eq!(guess("no_extension"), None);
    }

    #[test]
    fn resolve_prefers_declared() {
        assert_eq!(resolve("a.txt", Some("text/csv")), "text/csv");
        assert_eq!(resolve("a.txt", Some("")), "text/plain");
        assert_eq!(resolve("a.txt", None), "text/plain");
        assert_eq!(resolve("blob", None), OCTET_STREAM);
    }

    #[test]
    fn image_detection() {
        assert!(is_image("image/png"));
        assert!(is_image("IMAGE/JPEG"));
        assert!(is_image(WEBP));
        assert!(!is_image("application/pdf"));
        assert!(is_convertible_image("image/gif"));
        assert!(!is_convertible_image(WEBP));
        assert!(!is_convertible_image("text/plain"));
    }
}
