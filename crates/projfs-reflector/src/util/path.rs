//! Relative path helpers.
//!
//! Engine paths are relative to the virtualization root and use `\`; layer
//! paths in tests may use `/`. Both separators are accepted everywhere.

use std::path::{Component, Path, PathBuf};

/// Separator used when building paths handed back to the engine.
pub const SEPARATOR: char = std::path::MAIN_SEPARATOR;

fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Split a relative path into parent directory and final name.
///
/// # Arguments
/// * `relative_path` - Path relative to the layer root
///
/// # Returns
/// `(parent, name)`; parent is empty for top-level entries.
pub fn split_parent(relative_path: &str) -> (&str, &str) {
    let trimmed: &str = relative_path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    }
}

/// Join a parent path and a child name.
///
/// # Arguments
/// * `parent` - Parent relative path (may be empty)
/// * `name` - Child name
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent.trim_end_matches(is_separator), SEPARATOR, name)
    }
}

/// Resolve a relative path beneath a root directory.
///
/// Empty, `.` and `..` segments are dropped so the result never leaves `root`.
///
/// # Arguments
/// * `root` - Root directory
/// * `relative_path` - Path relative to root, either separator
pub fn resolve_under(root: &Path, relative_path: &str) -> PathBuf {
    let mut full: PathBuf = root.to_path_buf();
    for segment in relative_path.split(is_separator) {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        full.push(segment);
    }
    full
}

/// Check if a symlink target is rooted (absolute, drive-letter or UNC form).
///
/// # Arguments
/// * `target` - Symlink target as stored in the layer
pub fn is_rooted(target: &str) -> bool {
    let mut chars = target.chars();
    match (chars.next(), chars.next()) {
        (Some(first), _) if is_separator(first) => true,
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => true,
        _ => false,
    }
}

/// Strip a root directory off an absolute path.
///
/// # Arguments
/// * `root` - Root directory
/// * `target` - Absolute path
///
/// # Returns
/// The remainder, or `None` unless every component of `root` matches.
pub fn strip_root(root: &Path, target: &Path) -> Option<String> {
    let mut target_parts = target.components();
    for root_part in root.components() {
        let target_part: Component<'_> = target_parts.next()?;
        if !component_eq(&root_part, &target_part) {
            return None;
        }
    }

    let rest: Vec<String> = target_parts
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(rest.join(&SEPARATOR.to_string()))
}

/// Rewrite an absolute path relative to a root directory.
///
/// Targets outside the root climb out with `..` segments. Returns `None` when
/// the two paths share no common prefix (e.g. different drives).
///
/// # Arguments
/// * `root` - Root directory
/// * `target` - Absolute path
pub fn relative_to_root(root: &Path, target: &Path) -> Option<String> {
    let root_parts: Vec<Component<'_>> = root.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();

    let common: usize = root_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| component_eq(a, b))
        .count();

    if common == 0 {
        return None;
    }

    let mut segments: Vec<String> = Vec::new();
    for _ in common..root_parts.len() {
        segments.push("..".to_string());
    }
    for part in &target_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }

    Some(segments.join(&SEPARATOR.to_string()))
}

// `\\?\C:` and `C:` name the same volume.
#[cfg(target_os = "windows")]
fn component_eq(a: &Component<'_>, b: &Component<'_>) -> bool {
    use std::path::Prefix;

    match (a, b) {
        (Component::Prefix(a), Component::Prefix(b)) => match (a.kind(), b.kind()) {
            (
                Prefix::Disk(x) | Prefix::VerbatimDisk(x),
                Prefix::Disk(y) | Prefix::VerbatimDisk(y),
            ) => x.eq_ignore_ascii_case(&y),
            (
                Prefix::UNC(server_a, share_a) | Prefix::VerbatimUNC(server_a, share_a),
                Prefix::UNC(server_b, share_b) | Prefix::VerbatimUNC(server_b, share_b),
            ) => server_a.eq_ignore_ascii_case(server_b) && share_a.eq_ignore_ascii_case(share_b),
            _ => a.as_os_str().eq_ignore_ascii_case(b.as_os_str()),
        },
        _ => a.as_os_str().eq_ignore_ascii_case(b.as_os_str()),
    }
}

#[cfg(not(target_os = "windows"))]
fn component_eq(a: &Component<'_>, b: &Component<'_>) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parent() {
        assert_eq!(split_parent("file.txt"), ("", "file.txt"));
        assert_eq!(split_parent("dir\\file.txt"), ("dir", "file.txt"));
        assert_eq!(split_parent("a/b/c"), ("a/b", "c"));
        assert_eq!(split_parent("dir\\sub\\"), ("dir", "sub"));
        assert_eq!(split_parent(""), ("", ""));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "a.txt"), "a.txt");
        assert_eq!(join("dir", "a.txt"), format!("dir{}a.txt", SEPARATOR));
    }

    #[test]
    fn test_resolve_under_drops_traversal() {
        let root = Path::new("/layer");
        assert_eq!(resolve_under(root, "a\\b"), Path::new("/layer/a/b"));
        assert_eq!(resolve_under(root, "../etc/x"), Path::new("/layer/etc/x"));
        assert_eq!(resolve_under(root, ""), Path::new("/layer"));
    }

    #[test]
    fn test_is_rooted() {
        assert!(is_rooted("/abs/path"));
        assert!(is_rooted("\\rooted"));
        assert!(is_rooted("C:\\layer\\x"));
        assert!(is_rooted("\\\\server\\share"));
        assert!(!is_rooted("relative\\x"));
        assert!(!is_rooted("..\\up"));
        assert!(!is_rooted(""));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_strip_root() {
        let root = Path::new("/layer/root");
        assert_eq!(
            strip_root(root, Path::new("/layer/root/dir/file.txt")),
            Some("dir/file.txt".to_string())
        );
        assert_eq!(strip_root(root, Path::new("/layer/root")), Some(String::new()));
        assert_eq!(strip_root(root, Path::new("/layer/rootish/x")), None);
        assert_eq!(strip_root(root, Path::new("/layer")), None);
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_strip_root_across_verbatim_prefix() {
        assert_eq!(
            strip_root(Path::new(r"\\?\C:\layer"), Path::new(r"c:\Layer\dir\a.txt")),
            Some(r"dir\a.txt".to_string())
        );
        assert_eq!(
            strip_root(Path::new(r"C:\layer"), Path::new(r"\\?\C:\layer\a.txt")),
            Some("a.txt".to_string())
        );
        assert_eq!(
            strip_root(Path::new(r"\\?\UNC\srv\share\layer"), Path::new(r"\\srv\share\layer\a.txt")),
            Some("a.txt".to_string())
        );
        assert_eq!(strip_root(Path::new(r"C:\layer"), Path::new(r"D:\layer\a.txt")), None);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/layer/root");
        assert_eq!(
            relative_to_root(root, Path::new("/layer/root/dir/file.txt")),
            Some("dir/file.txt".to_string())
        );
        assert_eq!(
            relative_to_root(root, Path::new("/layer/other")),
            Some("../other".to_string())
        );
    }
}
