//! Lexical path helpers used by cwd tracking and the rm rules.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Normalize `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(if path.has_root() { "/" } else { "." });
    }
    out
}

/// Resolve `target` against `base` and normalize the result.
pub fn resolve(base: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        normalize(target)
    } else {
        normalize(&base.join(target))
    }
}

/// Whether two paths name the same location.
///
/// Symlinks are resolved when both paths exist; otherwise the
/// normalized forms are compared.
pub fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(real_a), Ok(real_b)) => real_a == real_b,
        _ => normalize(a) == normalize(b),
    }
}

/// Whether `path` equals `root` or lies below it, comparing normalized forms.
pub fn is_within_or_equal(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

/// Whether `path` lies strictly below `root`.
pub fn is_strictly_within(path: &Path, root: &Path) -> bool {
    let path = normalize(path);
    let root = normalize(root);
    path != root && path.starts_with(&root)
}

/// True when any `/`-separated segment of `path` is `..`.
pub fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve() {
        let base = Path::new("/home/user/project");
        assert_eq!(resolve(base, "src"), PathBuf::from("/home/user/project/src"));
        assert_eq!(resolve(base, "../other"), PathBuf::from("/home/user/other"));
        assert_eq!(resolve(base, "/etc"), PathBuf::from("/etc"));
    }

    #[test]
    fn test_within() {
        let root = Path::new("/p");
        assert!(is_strictly_within(Path::new("/p/x"), root));
        assert!(!is_strictly_within(Path::new("/p"), root));
        assert!(!is_strictly_within(Path::new("/px"), root));
        assert!(is_within_or_equal(Path::new("/p"), root));
    }

    #[test]
    fn test_same_location_fallback() {
        assert!(same_location(
            Path::new("/definitely/missing/a/.."),
            Path::new("/definitely/missing")
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_same_location_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(same_location(&link, &real));
    }

    #[test]
    fn test_parent_segment() {
        assert!(has_parent_segment("/tmp/../etc"));
        assert!(!has_parent_segment("/tmp/a..b"));
    }
}
