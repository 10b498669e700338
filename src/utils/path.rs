use std::env;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use nix::unistd::{access, AccessFlags};

/// Finds executables by scanning a colon-separated search list.
///
/// The name is always treated as a bare executable name, even if it contains
/// a `/`. Without an explicit search list, `PATH` is read on every lookup.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    search_path: Option<String>,
}

impl PathResolver {
    pub fn from_env() -> Self {
        Self { search_path: None }
    }

    #[allow(dead_code)]
    pub fn with_search_path(search_path: impl Into<String>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(search_path) => find_file_in_path(name, search_path),
            None => match env::var("PATH") {
                Ok(search_path) => find_file_in_path(name, &search_path),
                Err(e) => {
                    debug!("PATH unavailable: {}", e);
                    None
                }
            },
        }
    }
}

pub fn find_file_in_path(filename: &str, search_path: &str) -> Option<PathBuf> {
    search_path
        .split(':')
        .filter(|segment| !segment.is_empty())
        .map(|segment| PathBuf::from(format!("{}/{}", segment, filename)))
        .find(|candidate| {
            let found = is_executable(candidate);
            trace!("checking {}: {}", candidate.display(), found);
            found
        })
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::os::unix::fs::PermissionsExt;

    fn make_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_finds_first_match() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = make_file(first.path(), "tool", 0o755);
        make_file(second.path(), "tool", 0o755);

        let search = format!("{}:{}", first.path().display(), second.path().display());
        assert_eq!(find_file_in_path("tool", &search), Some(expected));
    }

    #[test]
    fn test_skips_non_executable() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        make_file(first.path(), "tool", 0o644);
        let expected = make_file(second.path(), "tool", 0o700);

        let search = format!("{}:{}", first.path().display(), second.path().display());
        assert_eq!(find_file_in_path("tool", &search), Some(expected));
    }

    #[test]
    fn test_skips_directories_and_empty_segments() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let expected = make_file(dir.path(), "tool", 0o755);

        let search = format!("::{}:", dir.path().display());
        assert_eq!(find_file_in_path("sub", &search), None);
        assert_eq!(find_file_in_path("tool", &search), Some(expected));
    }

    #[test]
    fn test_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let search = dir.path().display().to_string();
        assert_eq!(find_file_in_path("definitely-missing", &search), None);
        assert_eq!(find_file_in_path("definitely-missing", ""), None);
    }

    #[test]
    fn test_absolute_name_is_still_searched() {
        let dir = tempfile::tempdir().unwrap();
        let search = dir.path().display().to_string();
        assert_eq!(find_file_in_path("/bin/sh", &search), None);
    }

    #[test]
    fn test_name_with_slash_is_appended_to_segment() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let expected = make_file(&dir.path().join("bin"), "tool", 0o755);

        let search = dir.path().display().to_string();
        assert_eq!(find_file_in_path("bin/tool", &search), Some(expected));
    }

    #[test]
    fn test_resolver_with_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let expected = make_file(dir.path(), "tool", 0o755);
        let resolver = PathResolver::with_search_path(dir.path().display().to_string());
        assert_eq!(resolver.resolve("tool"), Some(expected));
        assert_eq!(resolver.resolve("other"), None);
    }

    #[test]
    fn test_resolver_from_env_finds_sh() {
        let path = PathResolver::from_env().resolve("sh").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("sh"));
    }
}
