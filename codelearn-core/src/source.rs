//! # Source Reader
//!
//! Loads a source file's full text plus a little metadata (file name,
//! extension, detected language, line count).

use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Programming language inferred from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    TypeScriptReact,
    JavaScript,
    JavaScriptReact,
    Go,
    Ruby,
    Python,
    Java,
    C,
    Cpp,
    Rust,
    Swift,
    Kotlin,
    Php,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "ts" => Self::TypeScript,
            "tsx" => Self::TypeScriptReact,
            "js" => Self::JavaScript,
            "jsx" => Self::JavaScriptReact,
            "go" => Self::Go,
            "rb" | "ruby" => Self::Ruby,
            "py" => Self::Python,
            "java" => Self::Java,
            "c" => Self::C,
            "cpp" | "cc" => Self::Cpp,
            "rs" => Self::Rust,
            "swift" => Self::Swift,
            "kt" => Self::Kotlin,
            "php" => Self::Php,
            _ => Self::Unknown,
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript",
            Self::TypeScriptReact => "TypeScript React",
            Self::JavaScript => "JavaScript",
            Self::JavaScriptReact => "JavaScript React",
            Self::Go => "Go",
            Self::Ruby => "Ruby",
            Self::Python => "Python",
            Self::Java => "Java",
            Self::C => "C",
            Self::Cpp => "C++",
            Self::Rust => "Rust",
            Self::Swift => "Swift",
            Self::Kotlin => "Kotlin",
            Self::Php => "PHP",
            Self::Unknown => "Unknown",
        }
    }

    /// Info string for a Markdown code fence
    pub fn fence_tag(&self) -> &'static str {
        match self {
            Self::TypeScript | Self::TypeScriptReact => "typescript",
            Self::JavaScript | Self::JavaScriptReact => "javascript",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::Python => "python",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Rust => "rust",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Php => "php",
            Self::Unknown => "",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A loaded source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as requested
    pub path: String,
    pub content: String,
    /// Last path component
    pub file_name: String,
    /// Text after the last '.' of the file name, empty when there is none
    pub extension: String,
    pub language: Language,
    /// Number of '\n'-separated segments in `content`
    pub lines: usize,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        let file_name = file_name_of(&path).to_string();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();
        let language = Language::from_extension(&extension);
        let lines = content.split('\n').count();

        Self {
            path,
            content,
            file_name,
            extension,
            language,
            lines,
        }
    }
}

/// Last component of a '/' or '\\' separated path
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Loads source text for analysis
#[allow(async_fn_in_trait)]
pub trait SourceReader: Send + Sync {
    /// Fails with `FileNotFound` when `path` does not resolve to a readable file
    async fn read(&self, path: &str) -> Result<SourceFile>;
}

/// Reads from the local filesystem, optionally relative to a base directory
#[derive(Debug, Clone, Default)]
pub struct FsSourceReader {
    base_dir: Option<PathBuf>,
}

impl FsSourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) if Path::new(path).is_relative() => base.join(path),
            _ => PathBuf::from(path),
        }
    }
}

impl SourceReader for FsSourceReader {
    async fn read(&self, path: &str) -> Result<SourceFile> {
        let resolved = self.resolve(path);
        debug!(path = %resolved.display(), "reading source file");

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| error::source_read_failed(path, e))?;
        if !metadata.is_file() {
            return Err(crate::error::Error::file_not_found(path)
                .with_operation("source::read")
                .with_context("reason", "not a regular file"));
        }

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| error::source_read_failed(path, e))?;

        Ok(SourceFile::new(path, content))
    }
}
