//! Layer entry metadata.

use std::sync::Arc;
use std::time::SystemTime;

use bitflags::bitflags;

bitflags! {
    /// Win32 file attribute bits carried on a layer entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u32 {
        const READONLY = 0x0000_0001;
        const HIDDEN = 0x0000_0002;
        const SYSTEM = 0x0000_0004;
        const DIRECTORY = 0x0000_0010;
        const ARCHIVE = 0x0000_0020;
        const NORMAL = 0x0000_0080;
        const TEMPORARY = 0x0000_0100;
        const SPARSE_FILE = 0x0000_0200;
        const REPARSE_POINT = 0x0000_0400;
        const COMPRESSED = 0x0000_0800;
        const OFFLINE = 0x0000_1000;
        const NOT_CONTENT_INDEXED = 0x0000_2000;
        const ENCRYPTED = 0x0000_4000;
    }
}

/// The four timestamps of a layer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub creation: SystemTime,
    pub last_access: SystemTime,
    pub last_write: SystemTime,
    pub change: SystemTime,
}

impl FileTimes {
    /// Use the same instant for every timestamp.
    ///
    /// # Arguments
    /// * `time` - Timestamp to apply
    pub fn uniform(time: SystemTime) -> Self {
        Self {
            creation: time,
            last_access: time,
            last_write: time,
            change: time,
        }
    }
}

impl Default for FileTimes {
    fn default() -> Self {
        Self::uniform(SystemTime::UNIX_EPOCH)
    }
}

/// One entry read from the layer.
///
/// Built fresh on every listing or lookup and never mutated afterwards.
/// The symlink target of a reparse point is not stored here; it is resolved
/// on demand when the entry is projected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Name as stored in the layer (single path segment).
    pub name: Arc<str>,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Timestamps.
    pub times: FileTimes,
    /// Attribute bits, directory bit consistent with `is_directory`.
    pub attributes: FileAttributes,
}

impl FileRecord {
    /// Create a record, forcing the directory attribute and size to agree
    /// with `is_directory`.
    ///
    /// # Arguments
    /// * `name` - Entry name
    /// * `size` - Size in bytes (ignored for directories)
    /// * `is_directory` - Whether this is a directory
    /// * `times` - Timestamps
    /// * `attributes` - Attribute bits as reported by the layer
    pub fn new(
        name: impl Into<Arc<str>>,
        size: u64,
        is_directory: bool,
        times: FileTimes,
        attributes: FileAttributes,
    ) -> Self {
        let mut attributes: FileAttributes = attributes;
        attributes.set(FileAttributes::DIRECTORY, is_directory);
        if attributes.is_empty() {
            attributes = FileAttributes::NORMAL;
        } else if attributes != FileAttributes::NORMAL {
            attributes.remove(FileAttributes::NORMAL);
        }

        Self {
            name: name.into(),
            size: if is_directory { 0 } else { size },
            is_directory,
            times,
            attributes,
        }
    }

    /// Create a plain file record.
    ///
    /// # Arguments
    /// * `name` - File name
    /// * `size` - Size in bytes
    pub fn file(name: impl Into<Arc<str>>, size: u64) -> Self {
        Self::new(name, size, false, FileTimes::default(), FileAttributes::ARCHIVE)
    }

    /// Create a plain directory record.
    ///
    /// # Arguments
    /// * `name` - Directory name
    pub fn directory(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, 0, true, FileTimes::default(), FileAttributes::DIRECTORY)
    }

    /// Check if this entry is a symbolic link or other reparse point.
    pub fn is_reparse_point(&self) -> bool {
        self.attributes.contains(FileAttributes::REPARSE_POINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_bit_forced_on() {
        let record = FileRecord::new("dir", 99, true, FileTimes::default(), FileAttributes::empty());
        assert!(record.attributes.contains(FileAttributes::DIRECTORY));
        assert_eq!(record.size, 0);
    }

    #[test]
    fn test_directory_bit_forced_off() {
        let record = FileRecord::new(
            "file.txt",
            42,
            false,
            FileTimes::default(),
            FileAttributes::DIRECTORY | FileAttributes::READONLY,
        );
        assert!(!record.attributes.contains(FileAttributes::DIRECTORY));
        assert!(record.attributes.contains(FileAttributes::READONLY));
        assert_eq!(record.size, 42);
    }

    #[test]
    fn test_empty_attributes_become_normal() {
        let record = FileRecord::new("f", 1, false, FileTimes::default(), FileAttributes::empty());
        assert_eq!(record.attributes, FileAttributes::NORMAL);

        let record = FileRecord::new(
            "f",
            1,
            false,
            FileTimes::default(),
            FileAttributes::NORMAL | FileAttributes::HIDDEN,
        );
        assert_eq!(record.attributes, FileAttributes::HIDDEN);
    }

    #[test]
    fn test_reparse_point() {
        let record = FileRecord::new(
            "link",
            0,
            false,
            FileTimes::default(),
            FileAttributes::REPARSE_POINT,
        );
        assert!(record.is_reparse_point());
        assert!(!FileRecord::file("a", 1).is_reparse_point());
    }
}
