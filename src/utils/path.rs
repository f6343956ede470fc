//! Path utilities for mapping inputs to outputs

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

/// Extension every transcoded output carries
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Resolve a path to an absolute one without requiring it to exist
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path)
}

/// Final path component as an owned string, empty when there is none
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Output file name for `input`, optionally overridden by `explicit`.
///
/// The result always ends in the fixed output extension.
pub fn output_file_name(input: &Path, explicit: Option<&str>) -> Option<String> {
    let source = match explicit.filter(|name| !name.trim().is_empty()) {
        Some(name) => {
            let candidate = Path::new(name);
            if has_output_extension(candidate) {
                return Some(name.to_string());
            }
            candidate
        }
        None => input,
    };

    source
        .file_stem()
        .map(|stem| format!("{}.{}", stem.to_string_lossy(), OUTPUT_EXTENSION))
}

fn has_output_extension(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(OUTPUT_EXTENSION))
}

/// Normalize a configured extension: lower case, no leading dot
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Whether `path` has one of `allowed` (already normalized) extensions
pub fn has_allowed_extension<'a, I>(path: &Path, allowed: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    let Some(extension) = path.extension() else {
        return false;
    };
    let extension = extension.to_string_lossy().to_lowercase();
    allowed.into_iter().any(|candidate| *candidate == extension)
}

/// Directory an input file's output goes to.
///
/// With `preserve_structure` the file's directory relative to `input_root` is
/// mirrored under `output_root`; otherwise outputs land in `output_root`.
pub fn nested_output_directory(
    file: &Path,
    input_root: &Path,
    output_root: &Path,
    preserve_structure: bool,
) -> PathBuf {
    if !preserve_structure {
        return output_root.to_path_buf();
    }

    let parent = file.parent().unwrap_or_else(|| Path::new(""));
    match parent.strip_prefix(input_root) {
        Ok(relative) if !relative.as_os_str().is_empty() => output_root.join(relative),
        _ => output_root.to_path_buf(),
    }
}
