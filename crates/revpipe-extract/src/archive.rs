//! Archive directory layout and the file lifecycle renames
//!
//! Every drop-file moves through exactly one path: drop -> tmp ->
//! (error | success). Files are never rewritten, only renamed, so a
//! crash mid-cycle leaves each file in exactly one place.

use std::fs;
use std::path::{Path, PathBuf};

use revpipe_core::time;

use crate::error::{ExtractError, Result};

/// The three archive subdirectories under the configured root.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    tmp: PathBuf,
    error: PathBuf,
    success: PathBuf,
}

impl ArchiveLayout {
    pub fn new(archive_root: impl AsRef<Path>) -> Self {
        let root = archive_root.as_ref();
        Self {
            tmp: root.join("tmp"),
            error: root.join("error"),
            success: root.join("success"),
        }
    }

    /// Create tmp/error/success (idempotent).
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.tmp, &self.error, &self.success] {
            fs::create_dir_all(dir).map_err(|source| ExtractError::io(dir, source))?;
        }
        Ok(())
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp
    }

    pub fn error_dir(&self) -> &Path {
        &self.error
    }

    pub fn success_dir(&self) -> &Path {
        &self.success
    }

    /// `tmp/tmp_<stem>_<unix_ts_with_underscore>.<ext>`
    pub fn tmp_path(&self, original_filename: &str) -> PathBuf {
        self.tmp.join(stamped_name("tmp", original_filename))
    }

    /// `error/error_<stem>_<unix_ts_with_underscore>.<ext>` for files
    /// rejected straight out of the drop directory.
    pub fn error_path(&self, original_filename: &str) -> PathBuf {
        self.error.join(stamped_name("error", original_filename))
    }

    /// Error location for a file already in tmp: the `tmp_` prefix is
    /// rewritten to `error_`, keeping the acquisition timestamp.
    pub fn error_path_for_tmp(&self, tmp_path: &Path) -> PathBuf {
        let file_name = tmp_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let renamed = file_name
            .strip_prefix("tmp_")
            .map(|rest| format!("error_{rest}"))
            .unwrap_or_else(|| format!("error_{file_name}"));
        self.error.join(renamed)
    }

    /// `success/<stem>__<YYYYMMDDHHssmm>.<ext>`
    pub fn success_path(&self, original_filename: &str) -> PathBuf {
        let (stem, ext) = split_name(original_filename);
        let stamp = time::format_datetime(time::now(), time::SUCCESS_STAMP_PATTERN);
        let name = match ext {
            Some(ext) => format!("{stem}__{stamp}.{ext}"),
            None => format!("{stem}__{stamp}"),
        };
        self.success.join(name)
    }

    /// Rename with the source path attached to any failure.
    pub fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|source| ExtractError::io(from, source))
    }
}

fn split_name(filename: &str) -> (&str, Option<&str>) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    }
}

/// `<prefix>_<stem>_<unix_secs>_<micros>.<ext>`
fn stamped_name(prefix: &str, original_filename: &str) -> String {
    let (stem, ext) = split_name(original_filename);
    let stamp = time::unix_stamp(time::now());
    match ext {
        Some(ext) => format!("{prefix}_{stem}_{stamp}.{ext}"),
        None => format!("{prefix}_{stem}_{stamp}"),
    }
}
