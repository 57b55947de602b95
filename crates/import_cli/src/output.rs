use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Writes `content` to `target` through a temp file in the same directory, so
/// readers never see a partially written result.
pub fn write_atomically(target: &Path, content: &str) -> Result<PathBuf, OutputError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| OutputError::Io(e.error))?;
    Ok(target.to_path_buf())
}

fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| OutputError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(OutputError::OutputDir(format!("{dir:?} is not a directory")));
        }
        Ok(())
    } else {
        fs::create_dir_all(dir).map_err(|e| OutputError::OutputDir(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("result.json");

        let written = write_atomically(&target, r#"{"address":"1 Main St"}"#).unwrap();

        assert_eq!(written, target);
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "{\"address\":\"1 Main St\"}\n"
        );
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("result.json");
        fs::write(&target, "old").unwrap();

        write_atomically(&target, "new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn parent_that_is_a_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = write_atomically(&blocker.join("result.json"), "{}").unwrap_err();

        assert!(matches!(err, OutputError::OutputDir(_)));
    }
}
