//! Named boolean facts.
//!
//! A literal is a `(name, value)` pair. Negation flips `value`; the `+`/`-`
//! suffix only exists in the textual form used by scenario files and logs.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").expect("literal name pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    name: String,
    value: bool,
}

impl Literal {
    pub fn new(name: impl Into<String>, value: bool) -> Result<Self, EngineError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, value })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn negation(&self) -> Literal {
        Literal {
            name: self.name.clone(),
            value: !self.value,
        }
    }

    pub fn is_negation_of(&self, other: &Literal) -> bool {
        self.name == other.name && self.value != other.value
    }
}

/// Check a bare literal name (no suffix).
pub fn validate_name(name: &str) -> Result<(), EngineError> {
    if NAME_RE.is_match(name) {
        return Ok(());
    }
    Err(EngineError::InvalidLiteral {
        text: name.to_string(),
        reason: "name must match [A-Za-z0-9_.:-]+".to_string(),
    })
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, if self.value { '+' } else { '-' })
    }
}

impl FromStr for Literal {
    type Err = EngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidLiteral {
            text: text.to_string(),
            reason: reason.to_string(),
        };
        let value = match text.chars().last() {
            Some('+') => true,
            Some('-') => false,
            _ => return Err(invalid("expected a trailing '+' or '-'")),
        };
        let name = &text[..text.len() - 1];
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        validate_name(name).map_err(|_| invalid("name must match [A-Za-z0-9_.:-]+"))?;
        Ok(Literal {
            name: name.to_string(),
            value,
        })
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
