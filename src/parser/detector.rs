//! Fenced diagram block detection by line scanning

use log::trace;
use serde::{Deserialize, Serialize};

/// A raw diagram block found by the scanner, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Language alias on the opening fence, lowercased
    pub alias: Option<String>,
    /// Inner text with at most one leading and one trailing blank line removed
    pub content: String,
    /// Line of the opening fence (1-based)
    pub start_line: usize,
    /// Line of the closing fence, or last document line when unclosed
    pub end_line: usize,
    /// Line holding the first line of `content`
    pub content_start_line: usize,
    /// Whether a closing fence was found
    pub closed: bool,
}

impl RawBlock {
    /// Get number of lines in this block
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// How the scanner finds blocks in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Markdown-style fenced blocks
    #[default]
    Fenced,
    /// The whole document is one diagram (raw `.mmd` files)
    WholeDocument,
}

/// Configuration for block detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Fence marker opening and closing a block
    pub fence: String,
    /// Language tags recognized as diagram blocks
    pub aliases: Vec<String>,
    /// Treat a fence without a language tag as a diagram block
    pub bare_fence_is_diagram: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fence: "```".to_string(),
            aliases: vec!["mermaid".to_string(), "mmd".to_string()],
            bare_fence_is_diagram: false,
        }
    }
}

/// What an opening fence line turned out to be
enum FenceOpen {
    Diagram(Option<String>),
    Foreign,
}

/// Scanner that finds diagram blocks by fence markers
#[derive(Debug, Clone)]
pub struct FenceScanner {
    config: DetectionConfig,
    mode: ScanMode,
}

impl FenceScanner {
    /// Create a scanner with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DetectionConfig::default())
    }

    /// Create a scanner with custom configuration
    #[must_use]
    pub fn with_config(mut config: DetectionConfig) -> Self {
        for alias in &mut config.aliases {
            *alias = alias.to_lowercase();
        }
        Self {
            config,
            mode: ScanMode::Fenced,
        }
    }

    /// Switch the scan mode
    #[must_use]
    pub const fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> ScanMode {
        self.mode
    }

    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scan the given document text
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<RawBlock> {
        let lines: Vec<&str> = text.lines().collect();
        let blocks = match self.mode {
            ScanMode::Fenced => self.scan_fenced(&lines),
            ScanMode::WholeDocument => Self::scan_whole(&lines).into_iter().collect(),
        };
        trace!(blocks = blocks.len(), lines = lines.len(); "Scanned document");
        blocks
    }

    fn scan_fenced(&self, lines: &[&str]) -> Vec<RawBlock> {
        let mut blocks = Vec::new();
        let mut pos = 0;

        while pos < lines.len() {
            match self.classify_open(lines[pos]) {
                Some(FenceOpen::Diagram(alias)) => {
                    let (block, next) = self.scan_diagram(lines, pos, alias);
                    blocks.push(block);
                    pos = next;
                }
                Some(FenceOpen::Foreign) => {
                    pos = self.skip_foreign(lines, pos);
                }
                None => pos += 1,
            }
        }

        blocks
    }

    /// Decide whether a line opens a fence, and of which kind
    fn classify_open(&self, line: &str) -> Option<FenceOpen> {
        let rest = line.trim().strip_prefix(self.config.fence.as_str())?;
        let tag = rest.split_whitespace().next();

        match tag {
            None if self.config.bare_fence_is_diagram => Some(FenceOpen::Diagram(None)),
            None => Some(FenceOpen::Foreign),
            Some(tag) => {
                let tag = tag.to_lowercase();
                if self.config.aliases.contains(&tag) {
                    Some(FenceOpen::Diagram(Some(tag)))
                } else {
                    Some(FenceOpen::Foreign)
                }
            }
        }
    }

    fn is_close(&self, line: &str) -> bool {
        line.trim() == self.config.fence
    }

    /// Scan a diagram block opening at `start`, returning it and the next line to scan
    fn scan_diagram(
        &self,
        lines: &[&str],
        start: usize,
        alias: Option<String>,
    ) -> (RawBlock, usize) {
        let body_start = start + 1;
        let close = lines[body_start..]
            .iter()
            .position(|line| self.is_close(line))
            .map(|offset| body_start + offset);

        let (body_end, end_index, next) = match close {
            Some(close) => (close, close, close + 1),
            None => (lines.len(), lines.len() - 1, lines.len()),
        };

        let (content, first_content) = extract_content(&lines[body_start..body_end]);

        let block = RawBlock {
            alias,
            content,
            start_line: start + 1,
            end_line: end_index + 1,
            content_start_line: (body_start + first_content + 1).min(end_index + 1),
            closed: close.is_some(),
        };

        (block, next)
    }

    /// Skip a non-diagram fenced block, returning the line after its close
    fn skip_foreign(&self, lines: &[&str], start: usize) -> usize {
        lines[start + 1..]
            .iter()
            .position(|line| self.is_close(line))
            .map_or(lines.len(), |offset| start + 1 + offset + 1)
    }

    fn scan_whole(lines: &[&str]) -> Option<RawBlock> {
        if lines.iter().all(|line| line.trim().is_empty()) {
            return None;
        }

        let (content, first_content) = extract_content(lines);
        Some(RawBlock {
            alias: None,
            content,
            start_line: 1,
            end_line: lines.len(),
            content_start_line: first_content + 1,
            closed: true,
        })
    }
}

impl Default for FenceScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Join body lines, dropping one blank line at each edge.
///
/// Returns the content and the index of its first line within `body`.
fn extract_content(body: &[&str]) -> (String, usize) {
    let mut first = 0;
    let mut last = body.len();

    if first < last && body[first].trim().is_empty() {
        first += 1;
    }
    if first < last && body[last - 1].trim().is_empty() {
        last -= 1;
    }

    (body[first..last].join("\n"), first)
}
