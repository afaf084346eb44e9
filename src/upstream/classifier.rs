//! Content classifier (C4) — decides `html|css|js|text|json|xml|binary` from
//! URL suffix and response content-type, and whether the dispatcher should
//! fetch as text or as bytes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Html,
    Css,
    Js,
    Text,
    Json,
    Xml,
    Binary,
}

const BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".avif", ".bmp", ".ico", ".svg", ".tiff",
    ".woff", ".woff2", ".ttf", ".otf", ".eot",
    ".mp3", ".wav", ".ogg", ".flac", ".aac", ".m4a",
    ".mp4", ".webm", ".mov", ".avi", ".mkv", ".flv", ".m3u8", ".ts",
    ".zip", ".gz", ".tar", ".rar", ".7z", ".bz2",
    ".pdf", ".wasm", ".exe", ".dmg", ".iso",
];

/// Stage 1 (§4.4): pre-detect binary from the URL path before fetching, so
/// the dispatcher can take the byte-preserving path from the start.
pub fn classify_by_suffix(path: &str) -> Option<Classification> {
    let lower = path.to_ascii_lowercase();
    // Strip query/fragment noise already handled by callers (we receive a
    // bare path), but guard anyway for defensive callers.
    let path_only = lower.split(['?', '#']).next().unwrap_or(&lower);
    if BINARY_EXTENSIONS.iter().any(|ext| path_only.ends_with(ext)) {
        Some(Classification::Binary)
    } else {
        None
    }
}

/// Stage 2 (§4.4): classify by content-type after fetching as text, so a
/// server that lied about its content-type (or omitted a suffix) is caught
/// before any text-encoding corruption can occur.
pub fn classify_by_content_type(content_type: &str) -> Classification {
    let ct = content_type.to_ascii_lowercase();
    let ct = ct.split(';').next().unwrap_or(&ct).trim();

    // image/svg+xml is explicitly binary — served verbatim (§8 boundary behavior).
    if ct == "image/svg+xml" {
        return Classification::Binary;
    }

    if ct.starts_with("image/")
        || ct.starts_with("audio/")
        || ct.starts_with("video/")
        || ct.starts_with("font/")
        || ct == "application/octet-stream"
        || ct == "application/pdf"
        || ct == "application/zip"
        || ct == "application/gzip"
        || ct == "application/wasm"
        || ct.starts_with("application/vnd.")
        || ct.starts_with("application/x-font")
    {
        return Classification::Binary;
    }

    if ct == "text/html" {
        return Classification::Html;
    }
    if ct == "text/css" {
        return Classification::Css;
    }
    if ct.contains("javascript") || ct.contains("ecmascript") {
        return Classification::Js;
    }
    if ct == "application/json" {
        return Classification::Json;
    }
    if ct == "application/xml" || ct == "text/xml" {
        return Classification::Xml;
    }
    if ct.starts_with("text/") {
        return Classification::Text;
    }
    Classification::Binary
}

impl Classification {
    pub fn is_binary(self) -> bool {
        matches!(self, Classification::Binary)
    }
}
