use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the provisioning and launch engine.
/// Every module returns `Result<T, LauncherError>`.
///
/// Messages carry URLs, paths and version ids only. Identity tokens never
/// flow into an error.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Resolution ──────────────────────────────────────
    #[error("Version manifest unavailable and no usable cache: {0}")]
    Resolution(String),

    #[error("Version not found in manifest: {0}")]
    VersionNotFound(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Natives ─────────────────────────────────────────
    #[error("Native extraction failed for {archive:?}: {reason}")]
    NativeExtraction { archive: PathBuf, reason: String },

    // ── Launch ──────────────────────────────────────────
    #[error("Invalid launch configuration: {0}")]
    LaunchConfig(String),

    #[error("Could not start {program:?}: {reason}")]
    ProcessSpawn { program: PathBuf, reason: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn download(url: &str, reason: impl ToString) -> Self {
        LauncherError::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Observers receive errors as plain display strings.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_serialize_as_display_text() {
        let err = LauncherError::VersionNotFound("9.9.9".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Version not found in manifest: 9.9.9\"");
    }

    #[test]
    fn download_error_names_url_and_reason() {
        let err = LauncherError::download("https://example.com/a.jar", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "Download failed for https://example.com/a.jar: HTTP 404"
        );
    }
}
