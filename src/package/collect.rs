// ABOUTME: Deterministic file collection for packaging.
// ABOUTME: Walks the tree without following symlinks and skips excluded path segments.

use std::path::{Component, Path, PathBuf};

use nonempty::NonEmpty;
use snafu::ResultExt;
use walkdir::WalkDir;

use super::error::{MetadataSnafu, PackageError};

/// Substring patterns matched against individual path segments.
///
/// A pattern excludes a path when it is contained in any segment of the
/// path relative to the package root, so `.git` skips `.git/` and
/// `.gitignore` but never a parent directory of the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludePatterns(Vec<String>);

impl ExcludePatterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            patterns
                .into_iter()
                .map(Into::into)
                // An empty pattern would match every segment.
                .filter(|p: &String| !p.is_empty())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether `relative` (a path below the root) has an excluded segment.
    pub fn excludes(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(segment) => {
                let segment = segment.to_string_lossy();
                self.0.iter().any(|p| segment.contains(p.as_str()))
            }
            _ => false,
        })
    }
}

/// Ordered list of paths to package. The first entry is always the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileManifest {
    paths: NonEmpty<PathBuf>,
}

impl FileManifest {
    /// The package root; every other entry lies below it.
    pub fn root(&self) -> &Path {
        &self.paths.head
    }

    /// Entries below the root, in walk order.
    pub fn entries(&self) -> impl Iterator<Item = &Path> {
        self.paths.tail.iter().map(PathBuf::as_path)
    }

    /// All paths including the root.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false: a manifest holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Collect every path under `root` that is not excluded.
///
/// Directories are visited parent-first and siblings in lexical order, so
/// an unchanged tree always yields the same manifest. Symlinks are listed
/// but never followed.
///
/// # Errors
///
/// Returns `PackageError::NotADirectory` if `root` is missing or not a
/// directory, and `PackageError::Walk` if any entry cannot be read.
pub fn collect(root: &Path, excludes: &ExcludePatterns) -> Result<FileManifest, PackageError> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PackageError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Err(e) => return Err(e).context(MetadataSnafu { path: root }),
    };
    if !metadata.is_dir() {
        return Err(PackageError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .path()
                    .strip_prefix(root)
                    .map(|relative| !excludes.excludes(relative))
                    .unwrap_or(true)
        });

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| PackageError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        paths.push(entry.into_path());
    }

    let paths = NonEmpty::from_vec(paths).ok_or_else(|| PackageError::NotADirectory {
        path: root.to_path_buf(),
    })?;
    tracing::debug!("Collected {} paths under {}", paths.len(), root.display());

    Ok(FileManifest { paths })
}
