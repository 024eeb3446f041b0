/*!
 * Source providers deliver the files to translate.
 *
 * The engine only sees `SourceProvider`; hosting APIs would implement it the
 * same way `LocalSourceProvider` does for a directory on disk.
 */

use async_trait::async_trait;
use log::{debug, warn};
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::SourceError;
use crate::translation::document::SourceFile;
use crate::translation::format::FormatRegistry;

/// Fetches raw files by relative path or folder
#[async_trait]
pub trait SourceProvider: Send + Sync + Debug {
    /// Fetch one file, or every file below a folder, at a reference
    async fn fetch(&self, target: &str, reference: Option<&str>) -> Result<Vec<SourceFile>, SourceError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Reads files from a local directory tree
#[derive(Debug, Clone)]
pub struct LocalSourceProvider {
    root: PathBuf,
    /// When set, only files with a known profile are delivered
    registry: Option<FormatRegistry>,
}

impl LocalSourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry: None,
        }
    }

    /// Deliver only files the registry knows how to classify
    pub fn with_format_filter(mut self, registry: FormatRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_target(&self, target: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(target.trim_start_matches(['/', '\\']));
        if relative.components().any(|c| matches!(c, Component::ParentDir | Component::Prefix(_))) {
            return Err(SourceError::NotFound(format!("{} is outside the source root", target)));
        }
        let path = self.root.join(relative);
        if !path.exists() {
            return Err(SourceError::NotFound(format!("{}", path.display())));
        }
        Ok(path)
    }

    fn accepts(&self, path: &Path) -> bool {
        self.registry.as_ref().is_none_or(|registry| registry.is_supported(path))
    }

    fn read(&self, path: &Path) -> Result<Option<SourceFile>, SourceError> {
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
        match String::from_utf8(bytes) {
            Ok(content) => Ok(Some(SourceFile::new(relative, content))),
            Err(_) => {
                warn!("Skipping {:?}: not valid UTF-8", relative);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SourceProvider for LocalSourceProvider {
    async fn fetch(&self, target: &str, reference: Option<&str>) -> Result<Vec<SourceFile>, SourceError> {
        if let Some(reference) = reference {
            debug!("Local source ignores reference {:?}", reference);
        }

        let path = self.resolve_target(target)?;
        if path.is_file() {
            return Ok(self.read(&path)?.into_iter().collect());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&path).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let message = e.to_string();
                match e.into_io_error() {
                    Some(io) => io_error(&path, io),
                    None => SourceError::NetworkError(message),
                }
            })?;
            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                continue;
            }
            if let Some(file) = self.read(entry.path())? {
                files.push(file);
            }
        }

        debug!("Fetched {} files from {:?}", files.len(), path);
        Ok(files)
    }

    fn name(&self) -> &str {
        "local"
    }
}

fn io_error(path: &Path, error: std::io::Error) -> SourceError {
    match error.kind() {
        ErrorKind::NotFound => SourceError::NotFound(format!("{}", path.display())),
        ErrorKind::PermissionDenied => SourceError::AuthRequired(format!("{}: {}", path.display(), error)),
        _ => SourceError::NetworkError(format!("{}: {}", path.display(), error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::FormatsConfig;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs/guide")).unwrap();
        fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        fs::write(dir.path().join("docs/guide/setup.rst"), "Setup\n=====\n").unwrap();
        fs::write(dir.path().join("docs/logo.bin"), [0xffu8, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("docs/notes.xyz"), "notes").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_fetch_folder_shouldReturnRelativePathsInOrder() {
        let dir = tree();
        let provider = LocalSourceProvider::new(dir.path());
        let files = provider.fetch("docs", None).await.unwrap();
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("docs/guide/setup.rst"),
                PathBuf::from("docs/index.md"),
                PathBuf::from("docs/notes.xyz"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_withFormatFilter_shouldDropUnknownExtensions() {
        let dir = tree();
        let provider = LocalSourceProvider::new(dir.path())
            .with_format_filter(FormatRegistry::new(FormatsConfig::default()));
        let files = provider.fetch("docs", Some("main")).await.unwrap();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_singleFile_shouldReturnIt() {
        let dir = tree();
        let provider = LocalSourceProvider::new(dir.path());
        let files = provider.fetch("docs/index.md", None).await.unwrap();
        assert_eq!(files, vec![SourceFile::new("docs/index.md", "# Home\n")]);
    }

    #[tokio::test]
    async fn test_fetch_missingOrEscapingTarget_shouldBeNotFound() {
        let dir = tree();
        let provider = LocalSourceProvider::new(dir.path());
        assert!(matches!(provider.fetch("nope", None).await, Err(SourceError::NotFound(_))));
        assert!(matches!(provider.fetch("../etc", None).await, Err(SourceError::NotFound(_))));
    }
}
