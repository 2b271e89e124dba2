//! Annotation grammar
//!
//! Recognizes `@directive` lines inside free-text comment blocks. The grammar is a table of
//! [`DirectiveRule`]s; each rule is a regex whose named capture groups map one-to-one onto
//! the fields of the record it produces. Lines that do not match any rule are ignored, so
//! ordinary comment prose never causes an error.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{error, trace};

use crate::models::{
    Acceptance, Connection, Direction, Exposure, Mitigation, Namespace, Relation, Review, Test,
    Transfer,
};

/// Leading whitespace and comment markers allowed before a directive
const LINE_PREFIX: &str = r"(?mR)^[ \t]*(?:(?://+|/\*+|\*+|#+|<!--|--\[\[|--|;+)[ \t]*)?";

/// Trailing whitespace and block-comment terminators allowed after a directive
const LINE_SUFFIX: &str = r"[ \t]*(?:\*+/|-->|\]\])?[ \t]*$";

/// Directive family, identified by its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Component,
    Control,
    Threat,
    Mitigate,
    Accept,
    Transfer,
    Expose,
    Connect,
    Review,
    Test,
}

impl Family {
    /// Whether this family declares an entity rather than relating entities
    pub fn is_declaration(&self) -> bool {
        matches!(self, Family::Component | Family::Control | Family::Threat)
    }
}

/// One entry of the grammar table
#[derive(Debug, Clone, Copy)]
pub struct DirectiveRule {
    /// Family produced by this rule
    pub family: Family,
    /// Pattern for the directive itself, without line anchoring
    pub pattern: &'static str,
}

impl DirectiveRule {
    /// Full line-anchored pattern source
    pub fn source(&self) -> String {
        format!("{}(?P<directive>{}){}", LINE_PREFIX, self.pattern, LINE_SUFFIX)
    }

    fn compile(&self) -> Result<CompiledRule, regex::Error> {
        Ok(CompiledRule {
            family: self.family,
            regex: Regex::new(&self.source())?,
        })
    }
}

/// The directive vocabulary. Capture group names are the record field names.
///
/// Declaration names run to the end of the line; an optional ` -- ` separates a description.
pub const DIRECTIVE_RULES: &[DirectiveRule] = &[
    DirectiveRule {
        family: Family::Component,
        pattern: r"@component[ \t]+(?P<name>.+?)(?:[ \t]+--[ \t]+(?P<description>.+?))?",
    },
    DirectiveRule {
        family: Family::Control,
        pattern: r"@control[ \t]+(?P<name>.+?)(?:[ \t]+--[ \t]+(?P<description>.+?))?",
    },
    DirectiveRule {
        family: Family::Threat,
        pattern: r"@threat[ \t]+(?P<name>.+?)(?:[ \t]+--[ \t]+(?P<description>.+?))?",
    },
    DirectiveRule {
        family: Family::Mitigate,
        pattern: r"@mitigates?[ \t]+(?P<component>.+?)[ \t]+against[ \t]+(?P<threat>.+?)[ \t]+with[ \t]+(?P<control>.+?)",
    },
    DirectiveRule {
        family: Family::Accept,
        pattern: r"@accepts?[ \t]+(?P<threat>.+?)[ \t]+to[ \t]+(?P<component>.+?)[ \t]+with[ \t]+(?P<details>.+?)",
    },
    DirectiveRule {
        family: Family::Transfer,
        pattern: r"@transfers?[ \t]+(?P<threat>.+?)[ \t]+from[ \t]+(?P<source_component>.+?)[ \t]+to[ \t]+(?P<destination_component>.+?)[ \t]+with[ \t]+(?P<details>.+?)",
    },
    DirectiveRule {
        family: Family::Expose,
        pattern: r"@exposes?[ \t]+(?P<component>.+?)[ \t]+to[ \t]+(?P<threat>.+?)[ \t]+with[ \t]+(?P<details>.+?)",
    },
    DirectiveRule {
        family: Family::Connect,
        pattern: r"@connects?[ \t]+(?P<source_component>.+?)[ \t]+(?P<direction>with|to)[ \t]+(?P<destination_component>.+?)[ \t]+with[ \t]+(?P<details>.+?)",
    },
    DirectiveRule {
        family: Family::Review,
        pattern: r"@reviews?[ \t]+(?P<component>\S+)[ \t]+(?P<details>.+?)",
    },
    DirectiveRule {
        family: Family::Test,
        pattern: r"@tests?[ \t]+(?P<control>.+?)[ \t]+for[ \t]+(?P<component>.+?)",
    },
];

struct CompiledRule {
    family: Family,
    regex: Regex,
}

static COMPILED_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    DIRECTIVE_RULES
        .iter()
        .filter_map(|rule| match rule.compile() {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                error!(family = ?rule.family, error = %e, "Directive pattern failed to compile");
                None
            }
        })
        .collect()
});

/// Lines that look like a directive; used to report skipped candidates
static CANDIDATE_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(&format!(
        r"{}@(?:component|control|threat|mitigates?|accepts?|transfers?|exposes?|connects?|reviews?|tests?)\b",
        LINE_PREFIX
    ))
    .ok()
});

/// What a recognized directive says
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `@component`, `@control` or `@threat`
    Declaration {
        namespace: Namespace,
        name: String,
        description: Option<String>,
    },
    /// Any relation directive
    Relation(Relation),
}

/// A recognized directive occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Family of the rule that matched
    pub family: Family,
    /// Typed content
    pub directive: Directive,
    /// The directive text as written, without comment markers
    pub text: String,
    /// Zero-based line offset inside the text block
    pub line: usize,
}

/// Tolerant directive recognizer
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationGrammar;

impl AnnotationGrammar {
    /// Create a grammar over the built-in directive table
    pub fn new() -> Self {
        AnnotationGrammar
    }

    /// Extract every directive occurrence from `text`
    ///
    /// Declarations come first, then relations; within each pass annotations are in line
    /// order. Text without directives yields an empty vector.
    pub fn parse(&self, text: &str) -> Vec<Annotation> {
        if !text.contains('@') {
            return Vec::new();
        }

        let line_starts = line_starts(text);
        let mut annotations = Vec::new();

        for rule in COMPILED_RULES.iter() {
            for caps in rule.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let Some(directive) = build_directive(rule.family, &caps) else {
                    continue;
                };
                let text = caps
                    .name("directive")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();

                annotations.push(Annotation {
                    family: rule.family,
                    directive,
                    text,
                    line: line_of(&line_starts, whole.start()),
                });
            }
        }

        annotations.sort_by_key(|a| (!a.family.is_declaration(), a.line));
        trace_skipped(text, &line_starts, &annotations);
        annotations
    }
}

/// Build the record for `family` from named captures. `None` when a field is blank.
fn build_directive(family: Family, caps: &Captures<'_>) -> Option<Directive> {
    let declaration = |namespace| {
        Some(Directive::Declaration {
            namespace,
            name: field(caps, "name")?,
            description: field(caps, "description"),
        })
    };

    let relation = match family {
        Family::Component => return declaration(Namespace::Component),
        Family::Control => return declaration(Namespace::Control),
        Family::Threat => return declaration(Namespace::Threat),
        Family::Mitigate => Relation::Mitigation(Mitigation {
            component: field(caps, "component")?,
            threat: field(caps, "threat")?,
            control: field(caps, "control")?,
            ..Default::default()
        }),
        Family::Accept => Relation::Acceptance(Acceptance {
            threat: field(caps, "threat")?,
            component: field(caps, "component")?,
            details: field(caps, "details")?,
            ..Default::default()
        }),
        Family::Transfer => Relation::Transfer(Transfer {
            threat: field(caps, "threat")?,
            source_component: field(caps, "source_component")?,
            destination_component: field(caps, "destination_component")?,
            details: field(caps, "details")?,
            ..Default::default()
        }),
        Family::Expose => Relation::Exposure(Exposure {
            component: field(caps, "component")?,
            threat: field(caps, "threat")?,
            details: field(caps, "details")?,
            ..Default::default()
        }),
        Family::Connect => Relation::Connection(Connection {
            source_component: field(caps, "source_component")?,
            direction: Direction::from_keyword(caps.name("direction")?.as_str())?,
            destination_component: field(caps, "destination_component")?,
            details: field(caps, "details")?,
            ..Default::default()
        }),
        Family::Review => Relation::Review(Review {
            component: field(caps, "component")?,
            details: field(caps, "details")?,
            ..Default::default()
        }),
        Family::Test => Relation::Test(Test {
            control: field(caps, "control")?,
            component: field(caps, "component")?,
            ..Default::default()
        }),
    };

    Some(Directive::Relation(relation))
}

fn field(caps: &Captures<'_>, name: &str) -> Option<String> {
    let value = caps.name(name)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

fn line_of(line_starts: &[usize], offset: usize) -> usize {
    match line_starts.binary_search(&offset) {
        Ok(line) => line,
        Err(next) => next - 1,
    }
}

fn trace_skipped(text: &str, line_starts: &[usize], annotations: &[Annotation]) {
    let Some(candidate) = CANDIDATE_LINE.as_ref() else {
        return;
    };
    let matched: HashSet<usize> = annotations.iter().map(|a| a.line).collect();
    for m in candidate.find_iter(text) {
        let line = line_of(line_starts, m.start());
        if !matched.contains(&line) {
            trace!(line, "Skipping malformed directive");
        }
    }
}
