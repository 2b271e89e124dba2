//! Data models for the threat graph
//!
//! Entities are stored by value and referenced from relations by name. Field names follow
//! the persisted JSON documents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-form extension slot carried by every entity and relation
pub type Custom = serde_json::Map<String, serde_json::Value>;

/// Delimiter separating hierarchy levels in component names (`Web:Frontend`)
pub const PATH_DELIMITER: char = ':';

/// Entity namespace. Names are unique within a namespace only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Components of the system under review
    Component,
    /// Security controls
    Control,
    /// Threats
    Threat,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Component => "component",
            Namespace::Control => "control",
            Namespace::Threat => "threat",
        };
        f.write_str(name)
    }
}

/// A component of the system, optionally placed in a hierarchy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Component {
    /// Identity key (equal to the name)
    pub id: String,
    /// Run that first registered this component
    #[serde(default)]
    pub run_id: String,
    /// Display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Hierarchical placements, each a list of parent segments
    #[serde(default)]
    pub paths: Vec<Vec<String>>,
    /// Extension slot
    #[serde(default)]
    pub custom: Custom,
}

/// A security control
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Control {
    /// Identity key (equal to the name)
    pub id: String,
    /// Run that first registered this control
    #[serde(default)]
    pub run_id: String,
    /// Display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Extension slot
    #[serde(default)]
    pub custom: Custom,
}

/// A threat
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Threat {
    /// Identity key (equal to the name)
    pub id: String,
    /// Run that first registered this threat
    #[serde(default)]
    pub run_id: String,
    /// Display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Extension slot
    #[serde(default)]
    pub custom: Custom,
}

/// Provenance of a relation: where the annotation was found
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Source {
    /// The annotation line as written
    #[serde(default)]
    pub annotation: String,
    /// Code following the comment that carried the annotation
    #[serde(default)]
    pub code: String,
    /// File the annotation came from
    #[serde(default)]
    pub filename: String,
    /// 1-based line number of the annotation, 0 when unknown
    #[serde(default)]
    pub line: usize,
}

/// Component `component` mitigates `threat` with `control`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mitigation {
    pub control: String,
    pub threat: String,
    pub component: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// `threat` is accepted as a risk on `component`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Acceptance {
    pub threat: String,
    pub component: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// `component` is exposed to `threat`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Exposure {
    pub threat: String,
    pub component: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// Responsibility for `threat` moves from `source_component` to `destination_component`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transfer {
    pub threat: String,
    pub source_component: String,
    pub destination_component: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// Data-flow direction of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `@connects A with B`: both ways
    #[default]
    With,
    /// `@connects A to B`: from A to B only
    To,
}

impl Direction {
    /// Parse the connection keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "with" => Some(Direction::With),
            "to" => Some(Direction::To),
            _ => None,
        }
    }

    /// Keyword as written in annotations
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::With => "with",
            Direction::To => "to",
        }
    }
}

/// `source_component` talks to `destination_component`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Connection {
    pub source_component: String,
    pub destination_component: String,
    pub direction: Direction,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// `component` needs a security review
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Review {
    pub component: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// `control` is tested for `component`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Test {
    pub component: String,
    pub control: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom: Custom,
    #[serde(default)]
    pub source: Source,
}

/// Any relation record
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    Mitigation(Mitigation),
    Acceptance(Acceptance),
    Exposure(Exposure),
    Transfer(Transfer),
    Connection(Connection),
    Review(Review),
    Test(Test),
}

impl Relation {
    /// Every entity this relation binds, in field order
    pub fn entity_refs(&self) -> Vec<(Namespace, &str)> {
        use Namespace::*;
        match self {
            Relation::Mitigation(m) => vec![
                (Control, m.control.as_str()),
                (Threat, m.threat.as_str()),
                (Component, m.component.as_str()),
            ],
            Relation::Acceptance(a) => {
                vec![(Threat, a.threat.as_str()), (Component, a.component.as_str())]
            }
            Relation::Exposure(e) => {
                vec![(Threat, e.threat.as_str()), (Component, e.component.as_str())]
            }
            Relation::Transfer(t) => vec![
                (Threat, t.threat.as_str()),
                (Component, t.source_component.as_str()),
                (Component, t.destination_component.as_str()),
            ],
            Relation::Connection(c) => vec![
                (Component, c.source_component.as_str()),
                (Component, c.destination_component.as_str()),
            ],
            Relation::Review(r) => vec![(Component, r.component.as_str())],
            Relation::Test(t) => {
                vec![(Component, t.component.as_str()), (Control, t.control.as_str())]
            }
        }
    }

    /// Provenance slot of the wrapped record
    pub fn source_mut(&mut self) -> &mut Source {
        match self {
            Relation::Mitigation(m) => &mut m.source,
            Relation::Acceptance(a) => &mut a.source,
            Relation::Exposure(e) => &mut e.source,
            Relation::Transfer(t) => &mut t.source,
            Relation::Connection(c) => &mut c.source,
            Relation::Review(r) => &mut r.source,
            Relation::Test(t) => &mut t.source,
        }
    }

    /// Relation kind name, as used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Relation::Mitigation(_) => "mitigation",
            Relation::Acceptance(_) => "acceptance",
            Relation::Exposure(_) => "exposure",
            Relation::Transfer(_) => "transfer",
            Relation::Connection(_) => "connection",
            Relation::Review(_) => "review",
            Relation::Test(_) => "test",
        }
    }
}

/// Where a text block came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// File path as displayed in reports
    pub filename: String,
    /// 1-based line on which the block starts
    pub line: usize,
    /// Code snippet that follows the block
    pub code: String,
}

/// One comment group, the unit of input to the grammar
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBlock {
    /// Comment text, one comment line per text line
    pub text: String,
    /// Provenance, when known
    pub location: Option<SourceLocation>,
}

impl TextBlock {
    /// Block without provenance
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    /// Block found at `filename:line`
    pub fn located(
        text: impl Into<String>,
        filename: impl Into<String>,
        line: usize,
        code: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            location: Some(SourceLocation {
                filename: filename.into(),
                line,
                code: code.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_keywords() {
        assert_eq!(Direction::from_keyword("with"), Some(Direction::With));
        assert_eq!(Direction::from_keyword("to"), Some(Direction::To));
        assert_eq!(Direction::from_keyword("from"), None);
        assert_eq!(Direction::To.as_str(), "to");
    }

    #[test]
    fn test_transfer_entity_refs_order() {
        let relation = Relation::Transfer(Transfer {
            threat: "Spoofing".to_string(),
            source_component: "Gateway".to_string(),
            destination_component: "Auth".to_string(),
            ..Default::default()
        });

        assert_eq!(
            relation.entity_refs(),
            vec![
                (Namespace::Threat, "Spoofing"),
                (Namespace::Component, "Gateway"),
                (Namespace::Component, "Auth"),
            ]
        );
        assert_eq!(relation.kind(), "transfer");
    }

    #[test]
    fn test_empty_custom_serializes_as_object() {
        let control = Control {
            id: "TLS".to_string(),
            name: "TLS".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&control).expect("Failed to serialize");
        assert_eq!(json["custom"], serde_json::json!({}));
    }
}
