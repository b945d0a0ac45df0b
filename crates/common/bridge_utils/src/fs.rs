use std::ffi::OsString;
use std::fs as std_fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Write file to filesystem atomically using std::fs synchronously.
///
/// The content is first written to a sibling `<name>.tmp` file which is then renamed.
/// A temporary file left over by an interrupted write is overwritten.
pub fn atomically_write_file_sync(dest: impl AsRef<Path>, content: &[u8]) -> std::io::Result<()> {
    let dest = dest.as_ref();
    let dest_dir = parent_dir(dest);
    let tempfile = temp_path(dest);

    // Write the content on a temp file
    let mut file = std_fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tempfile)?;

    if let Err(err) = file.write_all(content) {
        let _ = std_fs::remove_file(tempfile);
        return Err(err);
    }

    // Ensure the content reach the disk
    file.flush()?;
    file.sync_all()?;

    // Move the temp file to its destination
    if let Err(err) = std_fs::rename(&tempfile, dest) {
        let _ = std_fs::remove_file(tempfile);
        return Err(err);
    }

    // Ensure the new name reach the disk
    let dir = std_fs::File::open(dest_dir)?;
    dir.sync_all()?;

    Ok(())
}

/// Copy a file next to itself, the copy being suffixed with `.backup-<suffix>`
///
/// Returns the path of the copy.
pub fn backup_file(path: impl AsRef<Path>, suffix: &str) -> std::io::Result<PathBuf> {
    let path = path.as_ref();
    let mut backup_name = path.as_os_str().to_owned();
    backup_name.push(format!(".backup-{suffix}"));
    let backup_path = PathBuf::from(backup_name);

    std_fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut file_name = dest
        .file_name()
        .map(|name| name.to_owned())
        .unwrap_or_else(|| OsString::from("file"));
    file_name.push(".tmp");
    dest.with_file_name(file_name)
}

fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        None => Path::new("/").into(),
        Some(path) if path.as_os_str().is_empty() => Path::new(".").into(),
        Some(dir) => dir.into(),
    }
}
