//! Helpers shared by the enumeration, hydration and engine layers.

pub mod compare;
pub mod filetime;
pub mod path;
#[cfg(target_os = "windows")]
pub mod wstr;

pub use compare::{is_match_all, prj_file_name_compare, prj_file_name_match};
pub use filetime::{filetime_to_systemtime, systemtime_to_filetime};
