use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::parser::ScanMode;

/// Kinds of document the editor opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileType {
    /// Prose with fenced diagram blocks
    #[default]
    Markdown,
    /// A bare diagram description, one diagram per file
    Mermaid,
    /// Diagram file using the long extension, scanned like Markdown
    MermaidMarkdown,
}

impl FileType {
    /// Every file type, in dialog filter order
    pub const ALL: [Self; 3] = [Self::Markdown, Self::Mermaid, Self::MermaidMarkdown];

    /// Map a file extension; anything unrecognized is Markdown
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mmd" => Self::Mermaid,
            "mermaid" => Self::MermaidMarkdown,
            _ => Self::Markdown,
        }
    }

    /// Map a path by its extension
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Markdown, Self::from_extension)
    }

    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Mermaid => "mmd",
            Self::MermaidMarkdown => "mermaid",
        }
    }

    /// Label for open/save dialog filters
    #[must_use]
    pub const fn filter_name(&self) -> &'static str {
        match self {
            Self::Markdown => "Markdown Files",
            Self::Mermaid => "Mermaid Files",
            Self::MermaidMarkdown => "Mermaid Diagram Files",
        }
    }

    /// How documents of this type are scanned for diagrams
    #[must_use]
    pub const fn scan_mode(&self) -> ScanMode {
        match self {
            Self::Mermaid => ScanMode::WholeDocument,
            Self::Markdown | Self::MermaidMarkdown => ScanMode::Fenced,
        }
    }
}

/// A document as the editor sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub id: String,
    pub name: String,
    pub path: Option<String>,
    pub content: String,
    pub file_type: FileType,
    pub is_saved: bool,
}

impl DocumentFile {
    /// A new empty document with no path
    #[must_use]
    pub fn untitled() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            path: None,
            content: String::new(),
            file_type: FileType::Markdown,
            is_saved: false,
        }
    }

    /// A document freshly read from `path`
    pub fn from_path(path: &str, content: impl Into<String>) -> Self {
        let name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            path: Some(path.to_string()),
            content: content.into(),
            file_type: FileType::from_path(path),
            is_saved: true,
        }
    }

    /// Point the document at a new path, as after "save as"
    pub fn set_path(&mut self, path: &str) {
        let renamed = Self::from_path(path, String::new());
        self.name = renamed.name;
        self.path = renamed.path;
        self.file_type = renamed.file_type;
    }
}
