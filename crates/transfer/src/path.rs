//! Remote path helpers.
//!
//! Remote paths are relative to the share root and use `\` as the
//! separator. Input may use either `/` or `\`.

/// Returns `true` for the spellings of "the share root itself".
pub fn is_current_dir(path: &str) -> bool {
    matches!(path, "" | "." | "./" | ".\\")
}

/// Non-empty, non-`.` segments of `path`.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
}

/// Canonical backslash form of `path`.
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("\\")
}

/// Every accumulated prefix of `path`, from the root down.
///
/// `a/b\c` yields `a`, `a\b`, `a\b\c`.
pub fn prefixes(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for segment in segments(path) {
        if !current.is_empty() {
            current.push('\\');
        }
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

/// Joins an entry name onto a remote directory.
///
/// A current-directory `dir` yields just `name`.
pub fn join(dir: &str, name: &str) -> String {
    let base = normalize(dir);
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}\\{name}")
    }
}
