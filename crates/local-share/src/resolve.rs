//! Share path resolution and error mapping.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sharecopy_protocol::{ShareError, Status};

/// Resolves a share-relative path under `root`.
///
/// Accepts `\` and `/` separators. Parent-directory segments are rejected
/// so nothing outside the share can be reached.
pub fn resolve(root: &Path, path: &str) -> Result<PathBuf, ShareError> {
    let mut resolved = root.to_path_buf();
    for segment in path.split(['\\', '/']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(Status::InvalidParameter.into()),
            s if s.contains(':') => return Err(Status::InvalidParameter.into()),
            s => resolved.push(s),
        }
    }
    Ok(resolved)
}

/// Maps a filesystem error onto the status a share server would report.
pub fn map_io(err: std::io::Error) -> ShareError {
    match err.kind() {
        ErrorKind::AlreadyExists => Status::ObjectNameCollision.into(),
        ErrorKind::NotFound => Status::ObjectPathNotFound.into(),
        ErrorKind::PermissionDenied => Status::AccessDenied.into(),
        ErrorKind::StorageFull => Status::DiskFull.into(),
        ErrorKind::IsADirectory => Status::ObjectNameCollision.into(),
        _ => ShareError::Transport(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_mixed_separators() {
        let root = Path::new("/mnt/server/share");
        assert_eq!(
            resolve(root, "a\\b/c.txt").unwrap(),
            PathBuf::from("/mnt/server/share/a/b/c.txt")
        );
        assert_eq!(resolve(root, ".\\").unwrap(), root);
    }

    #[test]
    fn resolve_rejects_escape() {
        let root = Path::new("/mnt/server/share");
        let err = resolve(root, "a\\..\\..\\etc").unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidParameter));
        assert!(resolve(root, "C:\\windows").is_err());
    }

    #[test]
    fn io_errors_map_to_statuses() {
        let collision = map_io(std::io::Error::from(ErrorKind::AlreadyExists));
        assert!(collision.is_collision());
        assert_eq!(
            map_io(std::io::Error::from(ErrorKind::NotFound)).status(),
            Some(Status::ObjectPathNotFound)
        );
        assert_eq!(
            map_io(std::io::Error::from(ErrorKind::PermissionDenied)).status(),
            Some(Status::AccessDenied)
        );
        assert!(matches!(
            map_io(std::io::Error::other("boom")),
            ShareError::Transport(_)
        ));
    }
}
