//! Key-file reading and atomic replacement

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use presence_accounts_core::{CoreError, CoreResult, KeyFile};

/// Read and parse the file; a missing file is an empty key-file.
pub(super) async fn read_keyfile(path: &Path, separator: char) -> CoreResult<KeyFile> {
    match tokio::fs::read_to_string(path).await {
        Ok(data) => Ok(KeyFile::parse(&data, separator)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("{} does not exist yet, starting empty", path.display());
            Ok(KeyFile::new(separator))
        }
        Err(e) => Err(CoreError::StorageError(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Write to a sibling temp file, then rename it over `path`.
pub(super) async fn write_keyfile(path: &Path, file: &KeyFile) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_error("create", parent, &e))?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, file.to_data())
        .await
        .map_err(|e| storage_error("write", &tmp, &e))?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(storage_error("replace", path, &e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn storage_error(action: &str, path: &Path, e: &std::io::Error) -> CoreError {
    CoreError::StorageError(format!("Failed to {action} {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_sits_next_to_target() {
        assert_eq!(
            temp_path(Path::new("/var/lib/accounts.cfg")),
            PathBuf::from("/var/lib/accounts.cfg.tmp")
        );
    }
}
