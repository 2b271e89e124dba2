//! Project configuration types

use serde::{Deserialize, Serialize};

/// Default configuration file name, looked up in the project root
pub const DEFAULT_CONFIG_FILE: &str = "threatline.yaml";

/// Source extensions scanned when the configuration does not list any
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "go", "c", "h", "cc", "cpp", "hpp", "cs", "java", "kt", "scala", "swift", "js", "jsx",
    "ts", "tsx", "py", "rb", "php", "sh", "sql", "lua", "yaml", "yml", "toml", "tf",
];

/// Complete project configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Project identity, shown in the report header
    pub project: ProjectInfo,
    /// Link to the repository, used to build source links in reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    /// Directories whose `threatmodel/` entity libraries are merged before scanning
    #[serde(default)]
    pub imports: Vec<String>,
    /// Scan roots
    #[serde(default = "default_paths")]
    pub paths: Vec<PathEntry>,
    /// File extensions to scan, without the leading dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Project name and description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A scan root, either a bare path or a path with ignore globs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PathEntry {
    /// `- ./src`
    Plain(String),
    /// `- path: ./src` with `ignore: [node_modules]`
    Detailed {
        path: String,
        #[serde(default)]
        ignore: Vec<String>,
    },
}

impl PathEntry {
    /// Directory to scan
    pub fn path(&self) -> &str {
        match self {
            PathEntry::Plain(path) => path,
            PathEntry::Detailed { path, .. } => path,
        }
    }

    /// Glob patterns excluded from the scan
    pub fn ignore(&self) -> &[String] {
        match self {
            PathEntry::Plain(_) => &[],
            PathEntry::Detailed { ignore, .. } => ignore,
        }
    }
}

fn default_paths() -> Vec<PathEntry> {
    vec![PathEntry::Plain("./".to_string())]
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project: ProjectInfo {
                name: "threatline".to_string(),
                description: "A threatline project.".to_string(),
            },
            repository_url: None,
            imports: Vec::new(),
            paths: default_paths(),
            extensions: default_extensions(),
        }
    }
}
