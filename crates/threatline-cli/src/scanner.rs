//! Source discovery and comment extraction
//!
//! Files under each configured scan root are walked with `.gitignore` support, split into
//! comment groups and matched against the grammar in parallel. The results come back in a
//! stable order so the single-threaded merge into the graph is deterministic.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use threatline_config::{PathEntry, ProjectConfig};
use threatline_core::{scan_block, AnnotatedBlock, TextBlock};
use tracing::{debug, warn};

use crate::error::{CliError, CliResult};

/// Comment markers for one family of languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    /// Line comment prefixes
    pub line: &'static [&'static str],
    /// Block comment delimiters
    pub block: Option<(&'static str, &'static str)>,
}

const C_STYLE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
};

const HASH_STYLE: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: None,
};

const SQL_STYLE: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: Some(("/*", "*/")),
};

const LUA_STYLE: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: Some(("--[[", "]]")),
};

const MIXED_STYLE: CommentSyntax = CommentSyntax {
    line: &["//", "#"],
    block: Some(("/*", "*/")),
};

impl CommentSyntax {
    /// Comment syntax for a file extension, without the leading dot
    pub fn for_extension(extension: &str) -> Self {
        match extension {
            "rs" | "go" | "c" | "h" | "cc" | "cpp" | "hpp" | "cs" | "java" | "kt" | "scala"
            | "swift" | "js" | "jsx" | "ts" | "tsx" => C_STYLE,
            "py" | "rb" | "sh" | "yaml" | "yml" | "toml" => HASH_STYLE,
            "sql" => SQL_STYLE,
            "lua" => LUA_STYLE,
            _ => MIXED_STYLE,
        }
    }

    fn line_comment(&self, trimmed: &str) -> bool {
        self.line.iter().any(|marker| trimmed.starts_with(marker))
    }

    /// Byte offset of a line comment that follows code on the same line
    ///
    /// The marker must be preceded by whitespace, which keeps `http://` and `a#b` out.
    fn trailing_comment(&self, line: &str) -> Option<usize> {
        self.line
            .iter()
            .flat_map(|marker| line.match_indices(*marker).map(|(offset, _)| offset))
            .filter(|&offset| {
                let code = &line[..offset];
                code.ends_with([' ', '\t']) && !code.trim().is_empty()
            })
            .min()
    }
}

/// A run of comment lines, as 0-based line indexes into the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommentGroup {
    first: usize,
    last: usize,
    /// Byte offset of a comment trailing code on line `first`
    trailing: Option<usize>,
}

impl CommentGroup {
    fn lines(first: usize, last: usize) -> Self {
        Self {
            first,
            last,
            trailing: None,
        }
    }
}

/// Split a file into comment groups
///
/// Consecutive line comments form one group, as does one block comment. Each group becomes a
/// [`TextBlock`] whose text keeps the raw comment lines and whose code snippet is the first
/// non-blank line after the group. A line comment trailing code is a group of its own, with
/// that code as its snippet. Groups without an `@` cannot hold a directive and are dropped.
pub fn extract_blocks(filename: &str, content: &str, syntax: CommentSyntax) -> Vec<TextBlock> {
    let lines: Vec<&str> = content.lines().collect();
    let mut groups: Vec<CommentGroup> = Vec::new();
    let mut open_line: Option<usize> = None;
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim_start();

        if let Some((start, end)) = syntax.block.filter(|(start, _)| trimmed.starts_with(start)) {
            if let Some(first) = open_line.take() {
                groups.push(CommentGroup::lines(first, i - 1));
            }
            let first = i;
            let mut rest = &trimmed[start.len()..];
            while !rest.contains(end) && i + 1 < lines.len() {
                i += 1;
                rest = lines[i];
            }
            groups.push(CommentGroup::lines(first, i));
        } else if syntax.line_comment(trimmed) {
            open_line.get_or_insert(i);
        } else {
            if let Some(first) = open_line.take() {
                groups.push(CommentGroup::lines(first, i - 1));
            }
            if let Some(offset) = syntax.trailing_comment(lines[i]) {
                groups.push(CommentGroup {
                    first: i,
                    last: i,
                    trailing: Some(offset),
                });
            }
        }
        i += 1;
    }
    if let Some(first) = open_line {
        groups.push(CommentGroup::lines(first, lines.len() - 1));
    }

    groups
        .into_iter()
        .filter_map(|group| {
            let (text, code) = match group.trailing {
                Some(offset) => {
                    let line = lines[group.first];
                    (line[offset..].to_string(), line[..offset].trim())
                }
                None => {
                    let code = lines[group.last + 1..]
                        .iter()
                        .map(|line| line.trim())
                        .find(|line| !line.is_empty())
                        .unwrap_or_default();
                    (lines[group.first..=group.last].join("\n"), code)
                }
            };
            if !text.contains('@') {
                return None;
            }
            Some(TextBlock::located(text, filename, group.first + 1, code))
        })
        .collect()
}

/// Walks the configured scan roots and extracts annotated comment blocks
pub struct SourceScanner {
    root: PathBuf,
    paths: Vec<PathEntry>,
    extensions: BTreeSet<String>,
}

impl SourceScanner {
    /// Scanner for `config`, with scan roots resolved against `root`
    pub fn new(root: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        Self {
            root: root.into(),
            paths: config.paths.clone(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Every file to scan, sorted and deduplicated
    pub fn discover(&self) -> CliResult<Vec<PathBuf>> {
        let mut files = BTreeSet::new();

        for entry in &self.paths {
            let scan_root = self.root.join(entry.path());
            if !scan_root.exists() {
                warn!(path = %scan_root.display(), "Scan path does not exist, skipping");
                continue;
            }
            let ignores = build_ignore_set(entry.ignore())?;

            let walker = WalkBuilder::new(&scan_root)
                .hidden(true)
                .git_ignore(true)
                .build();

            for result in walker {
                let dir_entry = match result {
                    Ok(e) => e,
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                let path = dir_entry.path();
                if !path.is_file() || !self.has_scanned_extension(path) {
                    continue;
                }
                let relative = path.strip_prefix(&scan_root).unwrap_or(path);
                if ignores.is_match(relative) || relative.iter().any(|c| ignores.is_match(c)) {
                    debug!(path = %path.display(), "Ignored by pattern");
                    continue;
                }
                files.insert(path.to_path_buf());
            }
        }

        Ok(files.into_iter().collect())
    }

    /// Read and match every discovered file in parallel, keeping file order
    pub fn scan(&self) -> CliResult<Vec<AnnotatedBlock>> {
        let files = self.discover()?;
        debug!(count = files.len(), "Scanning source files");

        let per_file: Vec<Vec<AnnotatedBlock>> = files
            .par_iter()
            .map(|path| self.scan_file(path))
            .collect();

        Ok(per_file.into_iter().flatten().collect())
    }

    fn scan_file(&self, path: &Path) -> Vec<AnnotatedBlock> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                return Vec::new();
            }
        };
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        extract_blocks(
            &self.display_name(path),
            &content,
            CommentSyntax::for_extension(extension),
        )
        .into_iter()
        .map(scan_block)
        .filter(|scanned| !scanned.annotations.is_empty())
        .collect()
    }

    fn has_scanned_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(e))
            .unwrap_or(false)
    }

    /// Path relative to the project root with `/` separators
    fn display_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn build_ignore_set(patterns: &[String]) -> CliResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| CliError::Scan(format!("invalid ignore pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CliError::Scan(format!("failed to build ignore patterns: {}", e)))
}
