//! Image storage backends.
//!
//! A backend validates uploads against the configured [`UploadPolicy`] and
//! persists accepted bytes, returning a reference that can be recorded on the
//! appraisal. The backend is chosen once at startup by [`build_storage`].

mod local;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageKind, StorageSettings, UploadSettings};
use crate::error::AppResult;

pub use local::LocalStorage;
pub use s3::S3Storage;

/// Longest filename produced by [`sanitize_filename`].
const MAX_FILENAME_LEN: usize = 255;
/// Longest suffix still treated as an extension.
const MAX_EXTENSION_LEN: usize = 10;
const FALLBACK_FILENAME: &str = "unnamed_file";

/// Reasons an upload is rejected before anything is stored.
#[derive(Debug, thiserror::Error)]
pub enum FileValidationError {
    #[error("file is empty")]
    Empty,

    #[error("file is {size} bytes, maximum is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("file type '{0}' is not allowed")]
    DisallowedType(String),

    #[error("file content is not a recognized {0} image")]
    UnrecognizedContent(String),

    #[error("file declared as {declared} but contains {detected}")]
    ContentMismatch {
        declared: String,
        detected: &'static str,
    },
}

/// Leading bytes that identify each image type we can check.
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
pub(crate) const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const GIF_MAGICS: [&[u8]; 2] = [b"GIF87a", b"GIF89a"];

/// MIME types whose content [`sniff_image_type`] can recognize.
const SNIFFABLE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Identify an image by its magic bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(JPEG_MAGIC) {
        Some("image/jpeg")
    } else if bytes.starts_with(PNG_MAGIC) {
        Some("image/png")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if GIF_MAGICS.iter().any(|magic| bytes.starts_with(magic)) {
        Some("image/gif")
    } else {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Size and type limits applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size: usize,
    /// Lower-cased MIME types
    pub allowed_types: Vec<String>,
}

impl UploadPolicy {
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            max_file_size: settings.max_file_size,
            allowed_types: settings.allowed_file_types(),
        }
    }

    pub fn validate(&self, bytes: &[u8], declared_mime: &str) -> Result<(), FileValidationError> {
        if bytes.is_empty() {
            return Err(FileValidationError::Empty);
        }

        if bytes.len() > self.max_file_size {
            return Err(FileValidationError::TooLarge {
                size: bytes.len(),
                max: self.max_file_size,
            });
        }

        // Parameters such as `; charset=binary` do not change the type
        let essence = declared_mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if !self.allowed_types.iter().any(|t| *t == essence) {
            return Err(FileValidationError::DisallowedType(
                declared_mime.to_string(),
            ));
        }

        // Types without a known signature are accepted on their declaration
        if SNIFFABLE_TYPES.contains(&essence.as_str()) {
            match sniff_image_type(bytes) {
                Some(detected) if detected == essence => {}
                Some(detected) => {
                    return Err(FileValidationError::ContentMismatch {
                        declared: essence,
                        detected,
                    });
                }
                None => return Err(FileValidationError::UnrecognizedContent(essence)),
            }
        }

        Ok(())
    }
}

/// Where an object ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Backend specific reference, recorded as the appraisal's image path
    pub reference: String,
    pub public_url: Option<String>,
    pub size: u64,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    fn policy(&self) -> &UploadPolicy;

    /// Check an upload against the policy without storing it.
    fn validate(&self, bytes: &[u8], declared_mime: &str) -> Result<(), FileValidationError> {
        self.policy().validate(bytes, declared_mime)
    }

    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
}

/// Create the configured backend.
pub async fn build_storage(
    settings: &StorageSettings,
    policy: UploadPolicy,
) -> AppResult<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match settings.kind {
        StorageKind::Local => Arc::new(LocalStorage::new(
            settings.local_path.clone(),
            settings.public_base_url.clone(),
            policy,
        )),
        StorageKind::Cloud => Arc::new(S3Storage::new(&settings.s3, policy).await?),
    };

    tracing::info!("Storage backend: {}", settings.kind.as_str());
    Ok(backend)
}

/// Object key for an appraisal's image: `images/{appraisal_id}/{filename}`.
pub fn object_key(appraisal_id: &str, filename: &str) -> String {
    format!("images/{}/{}", appraisal_id, sanitize_filename(filename))
}

/// Whether `key` is a relative path made only of ordinary segments.
///
/// Dots inside a segment (`my.pic.jpg`) are fine; `.` and `..` segments are not.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Reduce a client-supplied filename to a safe single path segment.
///
/// Directory components are flattened into the name, anything outside
/// `[A-Za-z0-9._-]` becomes `_`, and the extension is kept.
pub fn sanitize_filename(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    let joined = normalized
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("_");

    let (stem, ext) = match joined.rsplit_once('.') {
        Some((stem, ext))
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext))
        }
        _ => (joined.as_str(), None),
    };

    let mut stem = replace_unsafe_chars(stem);
    if stem.is_empty() {
        stem = FALLBACK_FILENAME.to_string();
    }

    let max_stem = MAX_FILENAME_LEN - ext.map_or(0, |e| e.len() + 1);
    stem.truncate(max_stem);

    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn replace_unsafe_chars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            c
        } else {
            '_'
        };
        if (c == '_' || c == '.') && out.ends_with(c) {
            continue;
        }
        out.push(c);
    }
    out.trim_matches(|c| c == '_' || c == '.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy {
            max_file_size: 100,
            allowed_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
        }
    }

    fn jpeg(len: usize) -> Vec<u8> {
        let mut bytes = JPEG_MAGIC.to_vec();
        bytes.resize(len, 0x11);
        bytes
    }

    fn png(len: usize) -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(len, 0x22);
        bytes
    }

    #[test]
    fn test_validate_accepts_allowed_image() {
        assert!(policy().validate(&jpeg(10), "image/jpeg").is_ok());
        assert!(policy().validate(&png(100), "IMAGE/PNG").is_ok());
        assert!(policy().validate(&jpeg(10), "image/jpeg; q=1").is_ok());
    }

    #[test]
    fn test_validate_checks_content() {
        let err = policy()
            .validate(b"just some text pretending", "image/jpeg")
            .unwrap_err();
        assert!(matches!(err, FileValidationError::UnrecognizedContent(ref t) if t == "image/jpeg"));

        let err = policy().validate(&png(20), "image/jpeg").unwrap_err();
        assert!(matches!(
            err,
            FileValidationError::ContentMismatch { ref declared, detected: "image/png" }
                if declared == "image/jpeg"
        ));
    }

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(&jpeg(4)), Some("image/jpeg"));
        assert_eq!(sniff_image_type(&png(8)), Some("image/png"));
        assert_eq!(sniff_image_type(b"RIFF\x10\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"GIF89a..."), Some("image/gif"));
        assert_eq!(sniff_image_type(b"RIFF\x10\0\0\0WAVE"), None);
        assert_eq!(sniff_image_type(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(
            policy().validate(&[], "image/jpeg"),
            Err(FileValidationError::Empty)
        ));
    }

    #[test]
    fn test_validate_rejects_oversize() {
        let err = policy().validate(&[0u8; 101], "image/jpeg").unwrap_err();
        assert!(matches!(
            err,
            FileValidationError::TooLarge { size: 101, max: 100 }
        ));
    }

    #[test]
    fn test_validate_rejects_disallowed_type() {
        let err = policy().validate(b"hello", "text/plain").unwrap_err();
        assert!(matches!(err, FileValidationError::DisallowedType(ref t) if t == "text/plain"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\cat.png"), "C_Users_me_cat.png");
        assert_eq!(sanitize_filename("my photo (1).JPG"), "my_photo_1.JPG");
        assert_eq!(sanitize_filename("фото.jpg"), "unnamed_file.jpg");
        assert_eq!(sanitize_filename(""), "unnamed_file");
    }

    #[test]
    fn test_sanitize_filename_collapses_dot_runs() {
        assert_eq!(sanitize_filename("my..pic.jpg"), "my.pic.jpg");
        assert_eq!(sanitize_filename("a...b....png"), "a.b.png");
        assert!(is_safe_key(&object_key("0192-abc", "my..pic.jpg")));
    }

    #[test]
    fn test_is_safe_key() {
        assert!(is_safe_key("images/abc/photo.jpg"));
        assert!(is_safe_key("images/abc/my..pic.jpg"));
        for key in ["", "/etc/passwd", "../x.jpg", "images/../x.jpg", "images/./x.jpg", "a//b", "a\\b"] {
            assert!(!is_safe_key(key), "{}", key);
        }
    }

    #[test]
    fn test_sanitize_filename_caps_length() {
        let long = format!("{}.png", "a".repeat(300));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.len(), MAX_FILENAME_LEN);
        assert!(sanitized.ends_with(".png"));
    }

    #[test]
    fn test_object_key() {
        assert_eq!(
            object_key("0b7c", "../shot 1.jpeg"),
            "images/0b7c/shot_1.jpeg"
        );
    }
}
