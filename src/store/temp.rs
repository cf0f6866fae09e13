//! Temp file naming for atomic writes.
//!
//! A write to `dir/name.ext` goes through `dir/.name.<unixMillis>.<rand6>.ext.tmp`
//! first. The name is unique enough that concurrent writers never share a
//! temp file, and regular enough that the janitor can recognise leftovers.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

/// Pattern of temp files produced by [`temp_path_for`].
static TEMP_FILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.(.+)\.(\d+)\.([a-z0-9]{6})(\.[^.]+)?\.tmp$")
        .expect("TEMP_FILE_REGEX must compile")
});

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random component.
pub const SUFFIX_LEN: usize = 6;

/// Six random base36 characters.
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Sibling temp path for `target`.
pub fn temp_path_for(target: &Path, unix_millis: i64, suffix: &str) -> PathBuf {
    let dir = target.parent().unwrap_or_else(|| Path::new(""));
    let base = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!(
            ".{}.{}.{}.{}.tmp",
            base,
            unix_millis,
            suffix,
            ext.to_string_lossy()
        ),
        None => format!(".{}.{}.{}.tmp", base, unix_millis, suffix),
    };
    dir.join(name)
}

/// Whether `file_name` looks like a temp file left by an atomic write.
pub fn is_temp_file_name(file_name: &str) -> bool {
    TEMP_FILE_REGEX.is_match(file_name)
}
