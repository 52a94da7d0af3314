//! ProjFS file name collation and wildcard matching.
//!
//! Enumeration order and name lookup must agree with the engine's own rules,
//! so on Windows both operations defer to ProjFS. Other platforms get an
//! ordinal case-insensitive equivalent used by tests and tooling.

use std::cmp::Ordering;

#[cfg(target_os = "windows")]
use windows::Win32::Storage::ProjectedFileSystem::{PrjFileNameCompare, PrjFileNameMatch};

/// Compare two file names using ProjFS collation order.
///
/// This is the same ordering used by ProjFS for directory enumeration.
///
/// # Arguments
/// * `a` - First file name
/// * `b` - Second file name
///
/// # Returns
/// Ordering result.
#[cfg(target_os = "windows")]
pub fn prj_file_name_compare(a: &str, b: &str) -> Ordering {
    use crate::util::wstr::string_to_wide;

    let a_wide = string_to_wide(a);
    let b_wide = string_to_wide(b);

    unsafe {
        let result: i32 = PrjFileNameCompare(
            windows::core::PCWSTR::from_raw(a_wide.as_ptr()),
            windows::core::PCWSTR::from_raw(b_wide.as_ptr()),
        );

        result.cmp(&0)
    }
}

/// Compare two file names using ProjFS collation order (non-Windows fallback).
///
/// Ordinal comparison after simple uppercase folding, independent of locale.
///
/// # Arguments
/// * `a` - First file name
/// * `b` - Second file name
///
/// # Returns
/// Ordering result.
#[cfg(not(target_os = "windows"))]
pub fn prj_file_name_compare(a: &str, b: &str) -> Ordering {
    let a_folded = a.chars().flat_map(char::to_uppercase);
    let b_folded = b.chars().flat_map(char::to_uppercase);
    a_folded.cmp(b_folded)
}

/// Check whether a file name matches a ProjFS search expression.
///
/// An empty pattern and `*` match every name.
///
/// # Arguments
/// * `name` - File name to check
/// * `pattern` - Wildcard pattern
///
/// # Returns
/// True if name matches pattern.
#[cfg(target_os = "windows")]
pub fn prj_file_name_match(name: &str, pattern: &str) -> bool {
    use crate::util::wstr::string_to_wide;

    if is_match_all(pattern) {
        return true;
    }

    let name_wide = string_to_wide(name);
    let pattern_wide = string_to_wide(pattern);

    unsafe {
        PrjFileNameMatch(
            windows::core::PCWSTR::from_raw(name_wide.as_ptr()),
            windows::core::PCWSTR::from_raw(pattern_wide.as_ptr()),
        )
        .as_bool()
    }
}

/// Check whether a file name matches a ProjFS search expression (non-Windows fallback).
///
/// Supports `*`, `?` and the DOS wildcards `<`, `>` and `"`, compared
/// case-insensitively.
///
/// # Arguments
/// * `name` - File name to check
/// * `pattern` - Wildcard pattern
///
/// # Returns
/// True if name matches pattern.
#[cfg(not(target_os = "windows"))]
pub fn prj_file_name_match(name: &str, pattern: &str) -> bool {
    if is_match_all(pattern) {
        return true;
    }

    let name_folded: Vec<char> = name.chars().flat_map(char::to_uppercase).collect();
    let pattern_folded: Vec<char> = pattern.chars().flat_map(char::to_uppercase).collect();
    wildcard_match(&name_folded, &pattern_folded)
}

/// Check if a search expression selects every entry.
///
/// # Arguments
/// * `pattern` - Wildcard pattern
pub fn is_match_all(pattern: &str) -> bool {
    pattern.is_empty() || pattern == "*"
}

/// Match a folded name against a folded pattern.
///
/// `rest[i]` holds whether `name[i..]` matches the pattern suffix already
/// processed, so each pattern element costs one pass over the name.
#[cfg(not(target_os = "windows"))]
fn wildcard_match(name: &[char], pattern: &[char]) -> bool {
    let len: usize = name.len();
    let last_dot: Option<usize> = name.iter().rposition(|&c| c == '.');

    let mut rest: Vec<bool> = vec![false; len + 1];
    rest[len] = true;
    let mut here: Vec<bool> = vec![false; len + 1];

    for &element in pattern.iter().rev() {
        for i in (0..=len).rev() {
            let next: Option<char> = name.get(i).copied();
            here[i] = match element {
                '*' => rest[i] || (i < len && here[i + 1]),
                // DOS_STAR: anything up to the final period.
                '<' => {
                    let bound: usize = last_dot.filter(|&dot| dot >= i).unwrap_or(len);
                    rest[i] || (i < bound && here[i + 1])
                }
                // DOS_QM: one character, or nothing at a period or end of name.
                '>' => match next {
                    None | Some('.') => rest[i],
                    Some(_) => rest[i + 1],
                },
                // DOS_DOT: a period, or nothing at end of name.
                '"' => match next {
                    None => rest[i],
                    Some('.') => rest[i + 1],
                    Some(_) => false,
                },
                '?' => next.is_some() && rest[i + 1],
                literal => next == Some(literal) && rest[i + 1],
            };
        }
        std::mem::swap(&mut rest, &mut here);
    }

    rest[0]
}
