//! Notification kinds, masks and decisions.

use bitflags::bitflags;

use crate::callbacks::ProcessInfo;
use crate::error::Status;

bitflags! {
    /// Notification interest mask (PRJ_NOTIFY_TYPES).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NotificationType: u32 {
        const SUPPRESS_NOTIFICATIONS = 0x0000_0001;
        const FILE_OPENED = 0x0000_0002;
        const NEW_FILE_CREATED = 0x0000_0004;
        const FILE_OVERWRITTEN = 0x0000_0008;
        const PRE_DELETE = 0x0000_0010;
        const PRE_RENAME = 0x0000_0020;
        const PRE_CREATE_HARDLINK = 0x0000_0040;
        const FILE_RENAMED = 0x0000_0080;
        const HARDLINK_CREATED = 0x0000_0100;
        const FILE_HANDLE_CLOSED_NO_MODIFICATION = 0x0000_0200;
        const FILE_HANDLE_CLOSED_FILE_MODIFIED = 0x0000_0400;
        const FILE_HANDLE_CLOSED_FILE_DELETED = 0x0000_0800;
        const FILE_PRE_CONVERT_TO_FULL = 0x0000_1000;
    }
}

impl NotificationType {
    /// Keep whatever mask is already in effect for the path.
    pub const USE_EXISTING_MASK: Self = Self::from_bits_retain(0xFFFF_FFFF);

    /// Every notification the reflector knows how to handle.
    pub fn full_set() -> Self {
        Self::all().difference(Self::SUPPRESS_NOTIFICATIONS)
    }
}

/// A single notification delivered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    FileOpened,
    NewFileCreated,
    FileOverwritten,
    PreDelete,
    PreRename,
    PreCreateHardlink,
    FileRenamed,
    HardlinkCreated,
    FileHandleClosedNoModification,
    FileHandleClosedFileModified,
    FileHandleClosedFileDeleted,
    FilePreConvertToFull,
}

impl NotificationKind {
    /// Every kind, in mask bit order.
    pub const ALL: [NotificationKind; 12] = [
        NotificationKind::FileOpened,
        NotificationKind::NewFileCreated,
        NotificationKind::FileOverwritten,
        NotificationKind::PreDelete,
        NotificationKind::PreRename,
        NotificationKind::PreCreateHardlink,
        NotificationKind::FileRenamed,
        NotificationKind::HardlinkCreated,
        NotificationKind::FileHandleClosedNoModification,
        NotificationKind::FileHandleClosedFileModified,
        NotificationKind::FileHandleClosedFileDeleted,
        NotificationKind::FilePreConvertToFull,
    ];

    /// Decode a raw PRJ_NOTIFICATION value.
    ///
    /// The engine numbers notifications with the same single bits it uses
    /// in the interest mask.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.flag().bits() == raw)
    }

    /// Mask bit that subscribes to this kind.
    pub fn flag(self) -> NotificationType {
        match self {
            NotificationKind::FileOpened => NotificationType::FILE_OPENED,
            NotificationKind::NewFileCreated => NotificationType::NEW_FILE_CREATED,
            NotificationKind::FileOverwritten => NotificationType::FILE_OVERWRITTEN,
            NotificationKind::PreDelete => NotificationType::PRE_DELETE,
            NotificationKind::PreRename => NotificationType::PRE_RENAME,
            NotificationKind::PreCreateHardlink => NotificationType::PRE_CREATE_HARDLINK,
            NotificationKind::FileRenamed => NotificationType::FILE_RENAMED,
            NotificationKind::HardlinkCreated => NotificationType::HARDLINK_CREATED,
            NotificationKind::FileHandleClosedNoModification => {
                NotificationType::FILE_HANDLE_CLOSED_NO_MODIFICATION
            }
            NotificationKind::FileHandleClosedFileModified => {
                NotificationType::FILE_HANDLE_CLOSED_FILE_MODIFIED
            }
            NotificationKind::FileHandleClosedFileDeleted => {
                NotificationType::FILE_HANDLE_CLOSED_FILE_DELETED
            }
            NotificationKind::FilePreConvertToFull => NotificationType::FILE_PRE_CONVERT_TO_FULL,
        }
    }

    /// Name of the event signalled for this kind in test mode.
    pub fn signal_name(self) -> &'static str {
        match self {
            NotificationKind::FileOpened => "FileOpened",
            NotificationKind::NewFileCreated => "NewFileCreated",
            NotificationKind::FileOverwritten => "FileOverwritten",
            NotificationKind::PreDelete => "PreDelete",
            NotificationKind::PreRename => "PreRename",
            NotificationKind::PreCreateHardlink => "PreCreateHardlink",
            NotificationKind::FileRenamed => "FileRenamed",
            NotificationKind::HardlinkCreated => "HardlinkCreated",
            NotificationKind::FileHandleClosedNoModification => "FileHandleClosedNoModification",
            NotificationKind::FileHandleClosedFileModified
            | NotificationKind::FileHandleClosedFileDeleted => {
                "FileHandleClosedFileModifiedOrDeleted"
            }
            NotificationKind::FilePreConvertToFull => "FilePreConvertToFull",
        }
    }

    /// Whether a deny from the provider fails the operation.
    pub fn can_veto(self) -> bool {
        matches!(
            self,
            NotificationKind::FileOpened
                | NotificationKind::PreDelete
                | NotificationKind::PreRename
                | NotificationKind::PreCreateHardlink
                | NotificationKind::FilePreConvertToFull
        )
    }

    /// Whether the provider may hand back a new interest mask.
    pub fn returns_mask(self) -> bool {
        matches!(
            self,
            NotificationKind::FileOpened
                | NotificationKind::NewFileCreated
                | NotificationKind::FileOverwritten
                | NotificationKind::FileRenamed
        )
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One notification as seen by policy code.
#[derive(Debug, Clone, Copy)]
pub struct NotificationEvent<'a> {
    pub kind: NotificationKind,
    /// Path relative to the virtualization root.
    pub relative_path: &'a str,
    /// Rename or hardlink destination, when the engine supplies one.
    pub destination_path: Option<&'a str>,
    pub is_directory: bool,
    pub process: ProcessInfo<'a>,
    /// Set for handle-close notifications on modified files.
    pub is_file_modified: bool,
}

/// Decision for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationOutcome {
    /// `Ok` to allow, `AccessDenied` to veto.
    pub status: Status,
    /// Replacement interest mask for the path.
    pub new_mask: Option<NotificationType>,
}

impl NotificationOutcome {
    /// Allow without touching the mask.
    pub fn allow() -> Self {
        Self {
            status: Status::Ok,
            new_mask: None,
        }
    }

    /// Veto the operation.
    pub fn deny() -> Self {
        Self {
            status: Status::AccessDenied,
            new_mask: None,
        }
    }

    /// Allow and hand back an interest mask.
    pub fn allow_with_mask(mask: NotificationType) -> Self {
        Self {
            status: Status::Ok,
            new_mask: Some(mask),
        }
    }

    /// Check if the operation may proceed.
    pub fn is_allowed(&self) -> bool {
        self.status.is_ok()
    }
}
