use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use chrono::Local;
use tracing::info;

use crate::{errors::Error, Result};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const DATE_PLACEHOLDER: &str = "{time:YYYY-MM-DD}";

/// Filesystem housekeeping rooted at a base directory.
///
/// Every relative path passed to the methods resolves against the base;
/// absolute paths are used as-is (`Path::join` semantics).
#[derive(Clone, Debug)]
pub struct FileManager {
    base: PathBuf,
}

impl FileManager {
    /// Root at the current working directory.
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: std::env::current_dir()?,
        })
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base.join(path)
    }

    pub fn rename_file(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) -> Result<()> {
        fs::rename(self.resolve(old), self.resolve(new))?;
        Ok(())
    }

    pub fn rename_files<P: AsRef<Path>>(&self, mapping: &[(P, P)]) -> Result<()> {
        for (old, new) in mapping {
            self.rename_file(old, new)?;
        }
        Ok(())
    }

    /// Move a file into `dest_dir`, keeping its file name.
    pub fn move_file(&self, file: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<()> {
        let from = self.resolve(&file);
        let name = from
            .file_name()
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::InvalidPath {
                path: from.clone(),
                reason: "path has no file name".to_string(),
            })?;
        fs::rename(&from, self.resolve(dest_dir).join(name))?;
        Ok(())
    }

    pub fn move_files<P: AsRef<Path>>(&self, mapping: &[(P, P)]) -> Result<()> {
        for (file, dest_dir) in mapping {
            self.move_file(file, dest_dir)?;
        }
        Ok(())
    }

    /// Move every regular file out of `src_dir` into `dest_dir`, creating the
    /// destination if needed. Subdirectories stay behind.
    pub fn move_all_files(
        &self,
        src_dir: impl AsRef<Path>,
        dest_dir: impl AsRef<Path>,
    ) -> Result<()> {
        let src = self.resolve(src_dir);
        let dest = self.resolve(dest_dir);
        fs::create_dir_all(&dest)?;

        for entry in fs::read_dir(&src)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            fs::rename(&path, dest.join(name))?;
        }
        Ok(())
    }

    pub fn remove_file(&self, file: impl AsRef<Path>) -> Result<()> {
        fs::remove_file(self.resolve(file))?;
        Ok(())
    }

    /// Delete every regular file directly inside `dir` (non-recursive).
    pub fn remove_all_files(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = self.resolve(dir);
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Delete every regular file in the whole tree under `dir`, leaving the
    /// directory structure in place.
    pub fn clear_directory_tree(&self, dir: impl AsRef<Path>) -> Result<()> {
        clear_tree(&self.resolve(dir))
    }

    /// Create a directory (and parents) if missing, returning the resolved
    /// path. A literal `{time:YYYY-MM-DD}` in the path is replaced with the
    /// current local date.
    pub fn create_folder(&self, folder: &str) -> Result<PathBuf> {
        let folder = if folder.contains(DATE_PLACEHOLDER) {
            folder.replace(
                DATE_PLACEHOLDER,
                &Local::now().format("%Y-%m-%d").to_string(),
            )
        } else {
            folder.to_string()
        };

        let path = self.resolve(folder);
        if !path.exists() {
            fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    /// Poll `dir` once per second until a file with `ext` shows up, returning
    /// its path. [`Error::Timeout`] after `timeout`.
    pub fn wait_for_file_with_extension(
        &self,
        dir: impl AsRef<Path>,
        ext: &str,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let dir = self.resolve(dir);
        let start = Instant::now();

        loop {
            if let Some(found) = first_with_extension(&dir, ext)? {
                info!(path = %found.display(), "file appeared");
                return Ok(found);
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout(format!(
                    "no .{} file found in {} within {:?}",
                    ext.trim_start_matches('.'),
                    dir.display(),
                    timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Case-insensitive extension check. [`Error::InvalidPath`] when `dir`
    /// is not a directory.
    pub fn has_file_with_extension(&self, dir: impl AsRef<Path>, ext: &str) -> Result<bool> {
        let dir = self.resolve(dir);
        if !dir.is_dir() {
            return Err(Error::InvalidPath {
                path: dir,
                reason: "not a directory".to_string(),
            });
        }
        Ok(first_with_extension(&dir, ext)?.is_some())
    }
}

fn clear_tree(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            clear_tree(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn first_with_extension(dir: &Path, ext: &str) -> Result<Option<PathBuf>> {
    // A directory that does not exist yet simply has no matching file.
    if !dir.is_dir() {
        return Ok(None);
    }

    let want = ext.trim_start_matches('.').to_ascii_lowercase();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&want))
            .unwrap_or(false);
        if matches {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn rename_and_move_files() {
        let base = tmp("rpakit-files");
        fs::create_dir_all(base.join("inbox")).unwrap();
        fs::create_dir_all(base.join("outbox")).unwrap();
        touch(&base.join("inbox/a.txt"));

        let fm = FileManager::with_base(&base);
        fm.rename_file("inbox/a.txt", "inbox/b.txt").unwrap();
        assert!(base.join("inbox/b.txt").is_file());

        fm.move_file("inbox/b.txt", "outbox").unwrap();
        assert!(base.join("outbox/b.txt").is_file());
        assert!(!base.join("inbox/b.txt").exists());
    }

    #[test]
    fn move_all_files_skips_subdirectories() {
        let base = tmp("rpakit-moveall");
        fs::create_dir_all(base.join("src/keep")).unwrap();
        touch(&base.join("src/a.csv"));
        touch(&base.join("src/b.csv"));

        let fm = FileManager::with_base(&base);
        fm.move_all_files("src", "dst").unwrap();

        assert!(base.join("dst/a.csv").is_file());
        assert!(base.join("dst/b.csv").is_file());
        assert!(base.join("src/keep").is_dir());
    }

    #[test]
    fn clear_directory_tree_keeps_directories() {
        let base = tmp("rpakit-clear");
        fs::create_dir_all(base.join("tree/inner")).unwrap();
        touch(&base.join("tree/a.log"));
        touch(&base.join("tree/inner/b.log"));

        let fm = FileManager::with_base(&base);
        fm.clear_directory_tree("tree").unwrap();

        assert!(base.join("tree/inner").is_dir());
        assert!(!base.join("tree/a.log").exists());
        assert!(!base.join("tree/inner/b.log").exists());
    }

    #[test]
    fn create_folder_expands_date_placeholder() {
        let base = tmp("rpakit-folder");
        fs::create_dir_all(&base).unwrap();

        let fm = FileManager::with_base(&base);
        let created = fm.create_folder("reports/{time:YYYY-MM-DD}").unwrap();

        assert!(created.is_dir());
        let name = created.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, Local::now().format("%Y-%m-%d").to_string());
    }

    #[test]
    fn has_file_with_extension_is_case_insensitive() {
        let base = tmp("rpakit-ext");
        fs::create_dir_all(&base).unwrap();
        touch(&base.join("report.PDF"));

        let fm = FileManager::with_base(&base);
        assert!(fm.has_file_with_extension(".", ".pdf").unwrap());
        assert!(fm.has_file_with_extension(".", "pdf").unwrap());
        assert!(!fm.has_file_with_extension(".", "csv").unwrap());
    }

    #[test]
    fn has_file_with_extension_rejects_non_directory() {
        let fm = FileManager::with_base(tmp("rpakit-missing"));
        assert!(matches!(
            fm.has_file_with_extension("nowhere", "pdf"),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn wait_for_file_times_out() {
        let base = tmp("rpakit-wait");
        fs::create_dir_all(&base).unwrap();

        let fm = FileManager::with_base(&base);
        let err = fm
            .wait_for_file_with_extension(".", "csv", Duration::from_millis(0))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn wait_for_file_finds_existing_file() {
        let base = tmp("rpakit-wait-hit");
        fs::create_dir_all(&base).unwrap();
        touch(&base.join("done.csv"));

        let fm = FileManager::with_base(&base);
        let found = fm
            .wait_for_file_with_extension(".", "csv", Duration::from_secs(1))
            .unwrap();
        assert_eq!(found.file_name().unwrap(), "done.csv");
    }
}
