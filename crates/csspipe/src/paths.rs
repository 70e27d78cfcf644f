//! Lexical path helpers.
//!
//! Everything here works on path text only: nothing touches the filesystem,
//! so resolving a path that does not exist yet (an output target, say) is fine.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Fold `.` and `..` components.
///
/// `..` directly under the root stays at the root; leading `..` components of
/// a relative path are kept.
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut parts: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match parts.last() {
                Some(Utf8Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return Utf8PathBuf::from(".");
    }

    let mut out = Utf8PathBuf::new();
    for part in parts {
        out.push(part.as_str());
    }
    out
}

/// Resolve `path` against the working directory and normalize it.
///
/// If the working directory is unavailable (or not UTF-8) the path is only
/// normalized.
pub fn absolutize(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok())
    {
        Some(cwd) => normalize(&cwd.join(path)),
        None => normalize(path),
    }
}

/// Directory part of `path`; the root is its own directory.
pub fn dirname(path: &Utf8Path) -> Utf8PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        Some(_) => Utf8PathBuf::from("."),
        None => path.to_path_buf(),
    }
}

/// Path of `to` relative to the directory `from`.
///
/// Both are expected to be absolute. An empty path means they are equal.
pub fn relative(from: &Utf8Path, to: &Utf8Path) -> Utf8PathBuf {
    pathdiff::diff_paths(to, from)
        .and_then(|diff| Utf8PathBuf::from_path_buf(diff).ok())
        .unwrap_or_else(|| to.to_path_buf())
}

/// Render a path with forward slashes, the separator URLs and source maps use.
pub fn to_slash(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

/// Whether `reference` carries a URL scheme (`https:`, `data:`, `webpack:` ...).
pub fn has_scheme(reference: &str) -> bool {
    match reference.find(':') {
        // a single letter before the colon is a Windows drive, not a scheme
        Some(idx) if idx > 1 => reference[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}
