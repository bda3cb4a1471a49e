use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, trace};

use super::queue::WorkItem;

/// How a work item's path should be handled
#[derive(Debug)]
pub enum Classification {
    /// A directory and the children that could be listed
    Directory {
        children: Vec<WorkItem>,
        /// The listing failed part-way; `children` holds what was read before the failure
        listing_error: Option<io::Error>,
    },
    /// A regular file to search
    RegularFile,
    /// A symlink, socket, device or other entry that is never followed or searched
    Skipped,
    /// The path could not be stat'ed or listed at all
    Unreadable(io::Error),
}

/// Classifies a path with a single metadata query that does not follow symlinks.
///
/// Directory children are returned as new work items rather than traversed here, so the
/// traversal depth never grows the call stack.
pub fn classify(path: &Path) -> Classification {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("Error obtaining stats for {}: {}", path.display(), e);
            return Classification::Unreadable(e);
        }
    };

    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        trace!("Skipping symlink {}", path.display());
        Classification::Skipped
    } else if file_type.is_dir() {
        list_children(path)
    } else if file_type.is_file() {
        Classification::RegularFile
    } else {
        trace!("Skipping {} of type other", path.display());
        Classification::Skipped
    }
}

fn list_children(path: &Path) -> Classification {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Unable to open directory {}: {}", path.display(), e);
            return Classification::Unreadable(e);
        }
    };

    // read_dir never yields the "." and ".." entries
    let mut children = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => children.push(WorkItem::new(entry.path())),
            Err(e) => {
                debug!("Unable to read directory {}: {}", path.display(), e);
                return Classification::Directory {
                    children,
                    listing_error: Some(e),
                };
            }
        }
    }

    trace!("{} is a directory with {} entries", path.display(), children.len());
    Classification::Directory {
        children,
        listing_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_classify_directory() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        match classify(dir.path()) {
            Classification::Directory {
                children,
                listing_error,
            } => {
                assert!(listing_error.is_none());
                let mut names: Vec<_> = children
                    .iter()
                    .map(|c| c.path().file_name().unwrap().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                assert_eq!(names, vec!["a.txt", "sub"]);
            }
            other => panic!("expected directory, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_regular_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        File::create(&file_path).unwrap();

        assert!(matches!(classify(&file_path), Classification::RegularFile));
    }

    #[test]
    fn test_classify_missing_path() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            classify(&dir.path().join("missing")),
            Classification::Unreadable(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.txt");
        File::create(&target).unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let dir_link = dir.path().join("loop");
        std::os::unix::fs::symlink(dir.path(), &dir_link).unwrap();

        assert!(matches!(classify(&link), Classification::Skipped));
        assert!(matches!(classify(&dir_link), Classification::Skipped));
    }
}
