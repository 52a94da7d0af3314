//! Layer backed by a local directory tree.

use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{ProviderError, Result};
use crate::layer::record::{FileAttributes, FileRecord, FileTimes};
use crate::layer::{LayerFile, LayerStore};
use crate::util::path::resolve_under;

/// [`LayerStore`] reading straight from `std::fs`.
#[derive(Debug, Clone)]
pub struct FsLayer {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
}

impl FsLayer {
    /// Create a layer rooted at an existing directory.
    ///
    /// # Arguments
    /// * `root` - Layer root directory
    ///
    /// # Returns
    /// The layer, or `InvalidRootPath` if `root` is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root: PathBuf = root.into();
        if !root.is_dir() {
            return Err(ProviderError::InvalidRootPath(root.display().to_string()));
        }

        // Stored links spell the root as given, not as resolved.
        let root: PathBuf = std::path::absolute(&root)
            .map_err(|e| ProviderError::io_error(root.display().to_string(), e))?;
        let canonical_root: Option<PathBuf> = std::fs::canonicalize(&root)
            .ok()
            .filter(|canonical| canonical != &root);
        Ok(Self {
            root,
            canonical_root,
        })
    }

    fn full_path(&self, relative_path: &str) -> PathBuf {
        resolve_under(&self.root, relative_path)
    }

    /// Build a record from an entry's own (non-followed) metadata.
    fn record_for(&self, name: String, full_path: &Path, metadata: &Metadata) -> FileRecord {
        let is_symlink: bool = metadata.file_type().is_symlink();

        // A link to a directory is projected as a directory.
        let is_directory: bool = if is_symlink {
            full_path.metadata().map(|m| m.is_dir()).unwrap_or(false)
        } else {
            metadata.is_dir()
        };

        let mut attributes: FileAttributes = native_attributes(metadata);
        if is_symlink {
            attributes |= FileAttributes::REPARSE_POINT;
        }

        let size: u64 = if is_symlink { 0 } else { metadata.len() };
        FileRecord::new(name, size, is_directory, file_times(metadata), attributes)
    }
}

impl LayerStore for FsLayer {
    fn root(&self) -> &Path {
        &self.root
    }

    fn canonical_root(&self) -> Option<&Path> {
        self.canonical_root.as_deref()
    }

    fn list_directory(&self, relative_path: &str) -> Result<Vec<FileRecord>> {
        let dir_path: PathBuf = self.full_path(relative_path);
        let entries = std::fs::read_dir(&dir_path).map_err(|e| map_io(relative_path, e))?;

        let mut records: Vec<FileRecord> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| map_io(relative_path, e))?;
            let entry_path: PathBuf = entry.path();
            let metadata: Metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|e| map_io(relative_path, e))?;
            let name: String = entry.file_name().to_string_lossy().into_owned();
            records.push(self.record_for(name, &entry_path, &metadata));
        }

        tracing::debug!(path = %relative_path, count = records.len(), "listed layer directory");
        Ok(records)
    }

    fn open_file(&self, relative_path: &str) -> Result<LayerFile> {
        let full_path: PathBuf = self.full_path(relative_path);
        let metadata: Metadata =
            std::fs::metadata(&full_path).map_err(|e| map_io(relative_path, e))?;
        if metadata.is_dir() {
            return Err(ProviderError::not_found(relative_path));
        }

        let file: File = File::open(&full_path).map_err(|e| map_io(relative_path, e))?;

        Ok(LayerFile {
            reader: Box::new(file),
            len: metadata.len(),
        })
    }

    fn resolve_symlink_target(&self, relative_path: &str) -> Result<String> {
        let full_path: PathBuf = self.full_path(relative_path);
        let target: PathBuf = std::fs::read_link(&full_path).map_err(|e| map_io(relative_path, e))?;
        Ok(target.to_string_lossy().into_owned())
    }
}

fn map_io(relative_path: &str, err: std::io::Error) -> ProviderError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ProviderError::not_found(relative_path)
    } else {
        ProviderError::io_error(relative_path, err)
    }
}

fn file_times(metadata: &Metadata) -> FileTimes {
    let last_write: SystemTime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    FileTimes {
        creation: metadata.created().unwrap_or(last_write),
        last_access: metadata.accessed().unwrap_or(last_write),
        last_write,
        change: last_write,
    }
}

#[cfg(target_os = "windows")]
fn native_attributes(metadata: &Metadata) -> FileAttributes {
    use std::os::windows::fs::MetadataExt;
    FileAttributes::from_bits_truncate(metadata.file_attributes())
}

#[cfg(not(target_os = "windows"))]
fn native_attributes(metadata: &Metadata) -> FileAttributes {
    let mut attributes: FileAttributes = if metadata.is_dir() {
        FileAttributes::DIRECTORY
    } else {
        FileAttributes::ARCHIVE
    };
    if metadata.permissions().readonly() {
        attributes |= FileAttributes::READONLY;
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_missing_root() {
        let dir: TempDir = TempDir::new().unwrap();
        let result = FsLayer::new(dir.path().join("missing"));
        assert!(matches!(result, Err(ProviderError::InvalidRootPath(_))));
    }

    #[test]
    fn test_list_directory() {
        let dir: TempDir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let layer: FsLayer = FsLayer::new(dir.path()).unwrap();
        let mut records: Vec<FileRecord> = layer.list_directory("").unwrap();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_ref(), "a.txt");
        assert_eq!(records[0].size, 5);
        assert!(!records[0].is_directory);
        assert_eq!(records[1].name.as_ref(), "sub");
        assert!(records[1].is_directory);
        assert!(records[1].attributes.contains(FileAttributes::DIRECTORY));
        assert_eq!(records[1].size, 0);
    }

    #[test]
    fn test_list_missing_directory_is_not_found() {
        let dir: TempDir = TempDir::new().unwrap();
        let layer: FsLayer = FsLayer::new(dir.path()).unwrap();
        let result = layer.list_directory("nope");
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
    }

    #[test]
    fn test_open_file_nested_with_backslash() {
        let dir: TempDir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("f.bin"), b"xyz").unwrap();

        let layer: FsLayer = FsLayer::new(dir.path()).unwrap();
        let mut file: LayerFile = layer.open_file("sub\\f.bin").unwrap();
        assert_eq!(file.len, 3);

        let mut content: Vec<u8> = Vec::new();
        file.reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"xyz");
    }

    #[test]
    fn test_open_directory_is_not_found() {
        let dir: TempDir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let layer: FsLayer = FsLayer::new(dir.path()).unwrap();
        assert!(matches!(layer.open_file("sub"), Err(ProviderError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entry() {
        let dir: TempDir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("target_dir")).unwrap();
        std::os::unix::fs::symlink("target_dir", dir.path().join("link")).unwrap();

        let layer: FsLayer = FsLayer::new(dir.path()).unwrap();
        let records: Vec<FileRecord> = layer.list_directory("").unwrap();
        let link: &FileRecord = records.iter().find(|r| r.name.as_ref() == "link").unwrap();

        assert!(link.is_reparse_point());
        assert!(link.is_directory);
        assert_eq!(layer.resolve_symlink_target("link").unwrap(), "target_dir");
    }

    #[cfg(unix)]
    #[test]
    fn test_root_kept_as_given() {
        let dir: TempDir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        let alias = dir.path().join("alias");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        let layer: FsLayer = FsLayer::new(&alias).unwrap();
        assert_eq!(layer.root(), alias.as_path());
        assert_eq!(layer.canonical_root(), Some(std::fs::canonicalize(&real).unwrap().as_path()));
    }
}
