//! Dispatch over the supported file kinds.

use ngrename_core::adapter::{AnalysisError, FileAnalysis, FileHandler};
use ngrename_core::facts::FileKind;

use crate::logic::LogicHandler;
use crate::template::TemplateHandler;

/// File extensions the engine indexes.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "html"];

/// A handler for one supported file kind.
#[derive(Debug, Clone, Copy)]
pub enum Handler {
    Logic(LogicHandler),
    Template(TemplateHandler),
}

impl Handler {
    /// Pick the handler for a path by extension.
    pub fn for_path(path: &str) -> Option<Handler> {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext {
            "ts" => Some(Handler::Logic(LogicHandler::new())),
            "html" => Some(Handler::Template(TemplateHandler::new())),
            _ => None,
        }
    }

    pub fn kind(&self) -> FileKind {
        match self {
            Handler::Logic(h) => h.kind(),
            Handler::Template(h) => h.kind(),
        }
    }

    pub fn analyze(&self, path: &str, content: &str) -> Result<FileAnalysis, AnalysisError> {
        match self {
            Handler::Logic(h) => h.analyze(path, content),
            Handler::Template(h) => h.analyze(path, content),
        }
    }
}

/// Analyze a file, picking the handler from its extension.
pub fn analyze_path(path: &str, content: &str) -> Result<(FileKind, FileAnalysis), AnalysisError> {
    let handler = Handler::for_path(path).ok_or_else(|| AnalysisError::Unsupported {
        path: path.to_string(),
    })?;
    Ok((handler.kind(), handler.analyze(path, content)?))
}
