//! Static file resolution under a fixed public root.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Document served for paths without an extension.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Map a request path to a file under `root`.
///
/// The path is percent-decoded, then split on `/` and `\`. Empty segments
/// and segments made only of dots are dropped, so the result never leaves
/// `root`. When the last segment has no extension, `index.html` is appended.
pub fn resolve_static_path(root: &Path, request_path: &str) -> PathBuf {
    let decoded = percent_decode_str(request_path).decode_utf8_lossy();

    let segments: Vec<&str> = decoded
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && !s.chars().all(|c| c == '.') && !s.contains('\0'))
        .collect();

    let mut path = root.to_path_buf();
    for segment in &segments {
        path.push(segment);
    }

    let has_extension = segments.last().map_or(false, |s| s.contains('.'));
    if !has_extension {
        path.push(INDEX_DOCUMENT);
    }
    path
}

/// Content type for a file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str) -> PathBuf {
        resolve_static_path(Path::new("public"), path)
    }

    #[test]
    fn test_plain_file() {
        assert_eq!(resolve("/css/app.css"), PathBuf::from("public/css/app.css"));
    }

    #[test]
    fn test_directory_gets_index() {
        assert_eq!(resolve("/"), PathBuf::from("public/index.html"));
        assert_eq!(resolve("/docs"), PathBuf::from("public/docs/index.html"));
        assert_eq!(resolve("/docs/"), PathBuf::from("public/docs/index.html"));
    }

    #[test]
    fn test_traversal_segments_dropped() {
        assert_eq!(resolve("/../../etc/passwd"), PathBuf::from("public/etc/passwd/index.html"));
        assert_eq!(resolve("/....//....//etc/hosts.txt"), PathBuf::from("public/etc/hosts.txt"));
        assert_eq!(resolve("/%2e%2e/%2E%2E/secret.txt"), PathBuf::from("public/secret.txt"));
        assert_eq!(resolve("/..\\..\\win.ini"), PathBuf::from("public/win.ini"));
        assert_eq!(resolve("/a/%2e%2e%2fb.js"), PathBuf::from("public/a/b.js"));
    }

    #[test]
    fn test_space_decoded() {
        assert_eq!(resolve("/my%20file.txt"), PathBuf::from("public/my file.txt"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.PNG")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
