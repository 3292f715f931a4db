//! Helpers for building projects on disk and parsing them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use msbuild::project::{ParseContext, RootDocument, StaticRuntimeInformation};
use msbuild::{AnalysisOptions, TextSize};
use tempfile::TempDir;

/// A temporary project directory with a parse context.
pub struct ProjectFixture {
    dir: TempDir,
    cx: ParseContext,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self::with_runtime(StaticRuntimeInformation::default())
    }

    pub fn with_runtime(runtime: StaticRuntimeInformation) -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            cx: ParseContext::new(Arc::new(runtime)),
        }
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.cx = self.cx.with_options(options);
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn context(&self) -> &ParseContext {
        &self.cx
    }

    /// Write a file, creating its directories.
    pub fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    /// Write `relative` and parse it as the top-level document.
    pub fn parse(&self, relative: &str, text: &str) -> RootDocument {
        let path = self.write(relative, text);
        RootDocument::parse(&path, text, None, &self.cx).unwrap()
    }

    /// Parse again with `previous` available for reuse.
    pub fn reparse(&self, relative: &str, text: &str, previous: &RootDocument) -> RootDocument {
        let path = self.write(relative, text);
        RootDocument::parse(&path, text, Some(previous), &self.cx).unwrap()
    }

    /// Move a file's modification time forward so it reads as changed.
    pub fn touch(&self, relative: &str) {
        let file = fs::File::options().write(true).open(self.path(relative)).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
    }
}

/// Remove the `|` caret marker, returning the text and the caret offset.
pub fn split_marker(marked: &str) -> (String, TextSize) {
    let offset = marked.find('|').expect("text should contain a | marker");
    (marked.replacen('|', "", 1), TextSize::new(offset as u32))
}

/// Parse text that never touches the disk.
pub fn parse_detached(text: &str) -> RootDocument {
    let cx = ParseContext::new(Arc::new(StaticRuntimeInformation::default()));
    RootDocument::parse(Path::new("/nonexistent/Detached.proj"), text, None, &cx).unwrap()
}
