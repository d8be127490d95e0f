use std::path::{Path, PathBuf};

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write `contents` to `path`, creating parent directories first.
pub fn write_creating_dirs(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    std::fs::write(path, contents)
}

/// Resolve `relative` against the directory containing `base_file`.
///
/// Absolute paths are returned unchanged.
pub fn relative_to_file(base_file: &Path, relative: &str) -> PathBuf {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    match base_file.parent() {
        Some(dir) => dir.join(candidate),
        None => candidate.to_path_buf(),
    }
}
