use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Output path mirroring a relative input path below `output_dir`
    ///
    /// Absolute paths and `..` components are rejected so an artifact can
    /// never land outside the output directory.
    pub fn mirrored_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(output_dir: P1, relative: P2) -> Result<PathBuf> {
        let relative = relative.as_ref();
        let mut mirrored = output_dir.as_ref().to_path_buf();
        for component in relative.components() {
            match component {
                Component::Normal(part) => mirrored.push(part),
                Component::CurDir => {}
                _ => return Err(anyhow!("Refusing to mirror path outside the output directory: {:?}", relative)),
            }
        }
        Ok(mirrored)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a file through a temporary sibling, so readers never see half a file
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::ensure_dir(parent)?;

        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        temp.persist(path)
            .map_err(|e| anyhow!("Failed to move translated file into place at {:?}: {}", path, e))?;
        Ok(())
    }

    /// Remove a file that has been translated
    pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
        fs::remove_file(&path).with_context(|| format!("Failed to remove file: {:?}", path.as_ref()))
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirroredOutputPath_relative_shouldKeepStructure() {
        let path = FileManager::mirrored_output_path("/out/ar", "docs/guide/setup.md").unwrap();
        assert_eq!(path, PathBuf::from("/out/ar/docs/guide/setup.md"));
    }

    #[test]
    fn test_mirroredOutputPath_parentDir_shouldFail() {
        assert!(FileManager::mirrored_output_path("/out", "../secret.md").is_err());
        assert!(FileManager::mirrored_output_path("/out", "/etc/passwd").is_err());
    }

    #[test]
    fn test_writeAtomic_shouldCreateParentsAndOverwrite() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c.md");
        FileManager::write_atomic(&target, "first").unwrap();
        FileManager::write_atomic(&target, "second").unwrap();
        assert_eq!(FileManager::read_to_string(&target).unwrap(), "second");
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_appendToLogFile_shouldAppendTimestampedLines() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("issues.log");
        FileManager::append_to_log_file(&log, "one").unwrap();
        FileManager::append_to_log_file(&log, "two").unwrap();
        let content = FileManager::read_to_string(&log).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().nth(1).unwrap().ends_with("] two"));
    }
}
