//! Locator to filesystem path mapping.
//!
//! [`sanitize`] turns a script locator into a relative path that is safe to
//! join onto an output root:
//!
//! | Locator | Path |
//! |---------|------|
//! | `https://host:8080/js/app.js` | `https/host:8080/js/app.js` |
//! | `webpack:///src/index.ts` | `webpack/src/index.ts` |
//! | `webpack://./src/index.ts` | `webpack/src/index.ts` |
//! | `file:///usr/lib/app.js` | `file/usr/lib/app.js` |
//! | `chrome-extension://id/bg.js` | `chromeextension/id/bg.js` |
//! | `https://host/` | `https/host/index.js` |
//! | `not a url` | `invalid_urls/<nanos>-<seq>` |
//!
//! The result contains only normal components: no root, no prefix, no `.`
//! and no `..`. Valid locators map deterministically.
//!
//! Dot segments in a hierarchical path are resolved by URL parsing before
//! any `..` is replaced, so `http://h/a/../b.js` and `http://h/b.js` map to
//! the same file. A `..` that survives parsing (inside a segment, or in an
//! opaque path) becomes `__`.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// File name used when a locator names a directory.
pub const INDEX_FILE: &str = "index.js";

/// Bucket for locators that do not parse.
pub const INVALID_BUCKET: &str = "invalid_urls";

/// Bucket for schemes with no alphanumeric characters.
const UNKNOWN_BUCKET: &str = "unknown";

/// Replacement for every `..` occurrence.
const PARENT_REPLACEMENT: &str = "__";

/// Disambiguates fallback names created within the same nanosecond.
static INVALID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Sanitizer
// ============================================================================

/// Maps a locator to a relative, traversal-free path.
///
/// Total: every input yields a path. Unparseable locators, including empty
/// and relative strings, go to `invalid_urls/<timestamp-nanos>-<seq>`.
#[must_use]
pub fn sanitize(locator: &str) -> PathBuf {
    match Url::parse(locator) {
        Ok(url) => sanitize_url(&url),
        Err(_) => invalid_path(),
    }
}

/// Maps a parsed URL to a relative path.
#[must_use]
pub fn sanitize_url(url: &Url) -> PathBuf {
    let scheme = url.scheme();
    let authority = authority(url).replace("..", PARENT_REPLACEMENT);

    let raw_path = url.path();
    let path = raw_path.strip_prefix('/').unwrap_or(raw_path);
    let path = if path.is_empty() { INDEX_FILE } else { path };
    let path = path.replace("..", PARENT_REPLACEMENT);

    let mut out = PathBuf::new();
    match scheme {
        "webpack" => {
            out.push("webpack");
            if authority != "." {
                push_normal(&mut out, &authority);
            }
        }
        "file" => out.push("file"),
        "http" | "https" => {
            out.push(scheme);
            push_normal(&mut out, &authority);
        }
        other => {
            let bucket: String = other.chars().filter(char::is_ascii_alphanumeric).collect();
            out.push(if bucket.is_empty() { UNKNOWN_BUCKET } else { bucket.as_str() });
            push_normal(&mut out, &authority);
        }
    }

    let pushed = push_normal(&mut out, &path);
    if pushed == 0 || path.ends_with('/') {
        out.push(INDEX_FILE);
    }
    out
}

/// Host plus non-default port; empty when the URL has no host.
fn authority(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Appends the normal components of `raw`; returns how many were appended.
fn push_normal(out: &mut PathBuf, raw: &str) -> usize {
    let mut pushed = 0;
    for component in Path::new(raw).components() {
        if let Component::Normal(segment) = component {
            out.push(segment);
            pushed += 1;
        }
    }
    pushed
}

/// Unique fallback path for an unparseable locator.
fn invalid_path() -> PathBuf {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = INVALID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    Path::new(INVALID_BUCKET).join(format!("{nanos}-{seq}"))
}

// ============================================================================
// Tests
// ============================================================================
