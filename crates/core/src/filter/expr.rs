use std::fmt;

use crate::registry::{SourceKind, SourceSnapshot, SourceStatus, TestResult};

/// Fields an atom can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Type,
    Tag,
    Lang,
    Test,
    Status,
}

impl FilterField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "type" => Some(Self::Type),
            "tag" => Some(Self::Tag),
            "lang" => Some(Self::Lang),
            "test" => Some(Self::Test),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Tag => "tag",
            Self::Lang => "lang",
            Self::Test => "test",
            Self::Status => "status",
        }
    }
}

/// `field:value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub field: FilterField,
    pub value: String,
}

impl Atom {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    fn matches(&self, subject: &dyn FilterSubject) -> bool {
        match self.field {
            FilterField::Type => SourceKind::from_filter_value(&self.value) == Some(subject.kind()),
            FilterField::Tag => subject.has_tag(&self.value),
            FilterField::Lang => lang_matches(subject.language(), &self.value),
            FilterField::Test => match subject.test_result() {
                TestResult::Unknown => false,
                result => result.as_str().eq_ignore_ascii_case(&self.value),
            },
            FilterField::Status => {
                SourceStatus::from_filter_value(&self.value) == Some(subject.status())
            }
        }
    }
}

/// Case-insensitive prefix match: `en` matches `en-US` but not `fr-en`.
fn lang_matches(language: &str, prefix: &str) -> bool {
    language
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// What a filter is evaluated against.
pub trait FilterSubject {
    fn kind(&self) -> SourceKind;
    fn has_tag(&self, tag: &str) -> bool;
    fn language(&self) -> &str;
    fn test_result(&self) -> TestResult;
    fn status(&self) -> SourceStatus;
}

impl FilterSubject for SourceSnapshot {
    fn kind(&self) -> SourceKind {
        self.descriptor.kind
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.descriptor.has_tag(tag)
    }

    fn language(&self) -> &str {
        &self.descriptor.language
    }

    fn test_result(&self) -> TestResult {
        self.health.last_test_result
    }

    fn status(&self) -> SourceStatus {
        self.status
    }
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Atom(Atom),
    Not(Atom),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    pub fn evaluate(&self, subject: &dyn FilterSubject) -> bool {
        match self {
            Self::Atom(atom) => atom.matches(subject),
            Self::Not(atom) => !atom.matches(subject),
            Self::And(lhs, rhs) => lhs.evaluate(subject) && rhs.evaluate(subject),
            Self::Or(lhs, rhs) => lhs.evaluate(subject) || rhs.evaluate(subject),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(atom) => write!(f, "{}:{}", atom.field.as_str(), atom.value),
            Self::Not(atom) => write!(f, "!{}:{}", atom.field.as_str(), atom.value),
            Self::And(lhs, rhs) => write!(f, "({} AND {})", lhs, rhs),
            Self::Or(lhs, rhs) => write!(f, "({} OR {})", lhs, rhs),
        }
    }
}
