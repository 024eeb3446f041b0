/*!
 * Documents handled by the pipeline.
 */

use std::path::{Path, PathBuf};

use crate::translation::format::FormatProfile;

/// Raw file delivered by a source provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source root, mirrored in the output
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A source file with its structural profile resolved
///
/// Built once by the pipeline and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    content: String,
    profile: FormatProfile,
}

impl Document {
    pub fn new(file: SourceFile, profile: FormatProfile) -> Self {
        Self {
            path: file.path,
            content: file.content,
            profile,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn profile(&self) -> FormatProfile {
        self.profile
    }
}
