// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Positional field extraction from free-text log lines.
//!
//! A log line is a sequence of parenthetical groups mixed with free text:
//!
//! ```text
//! X(u1)Y(f1)(f2)(f3)(f4)(d1)(_)(_)(_)(_)
//!  ^^^^  ^^^^            ^^^^        ^^^
//!  #0    #1              #4          #9
//! ```
//!
//! An [`ExtractionRule`] maps output field names to group indices. A line with too few groups
//! for the rule becomes an [`ExtractionError`]; nothing here panics on short input.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{ExtractionError, ExtractionFailure};

/// `(`, any run of non-parenthesis characters, `)`.
const GROUP_PATTERN: &str = r"\([^()]*\)";

fn group_regex() -> &'static Regex {
    static GROUP_REGEX: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    GROUP_REGEX.get_or_init(|| Regex::new(GROUP_PATTERN).expect("group pattern is valid"))
}

/// Returns every parenthetical group in `message`, parentheses included, left to right.
pub fn parenthetical_groups(message: &str) -> Vec<&str> {
    group_regex()
        .find_iter(message)
        .map(|group| group.as_str())
        .collect()
}

/// Strips the enclosing parentheses from a group.
fn inner(group: &str) -> &str {
    // Groups always start with `(` and end with `)`, both single-byte.
    &group[1..group.len() - 1]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    pub index: usize,
}

/// Highest group index a rule may reference.
pub const MAX_GROUP_INDEX: usize = 1023;

/// Ordered mapping of output field name to parenthetical group index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    fields: Vec<FieldMapping>,
}

impl Default for ExtractionRule {
    fn default() -> Self {
        Self {
            fields: vec![
                FieldMapping {
                    name: "user_name".to_string(),
                    index: 0,
                },
                FieldMapping {
                    name: "friends".to_string(),
                    index: 4,
                },
                FieldMapping {
                    name: "date_created".to_string(),
                    index: 9,
                },
            ],
        }
    }
}

impl ExtractionRule {
    pub fn new(fields: Vec<FieldMapping>) -> Result<Self, String> {
        let rule = Self { fields };
        rule.validate()?;
        Ok(rule)
    }

    /// Checks that the rule names at least one field, names are unique and non-blank, and
    /// every index is at most [`MAX_GROUP_INDEX`].
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("extraction rule must name at least one field".to_string());
        }
        for (position, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(format!("field #{position} has an empty name"));
            }
            if field.index > MAX_GROUP_INDEX {
                return Err(format!(
                    "group index {} for field `{}` exceeds {MAX_GROUP_INDEX}",
                    field.index, field.name
                ));
            }
            if self.fields[..position].iter().any(|f| f.name == field.name) {
                return Err(format!("field `{}` is mapped more than once", field.name));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Minimum number of groups a line needs for this rule.
    pub fn required_groups(&self) -> usize {
        self.fields.iter().map(|f| f.index.saturating_add(1)).max().unwrap_or(0)
    }
}

/// Parses `name=index[,name=index...]`, e.g. `user_name=0,friends=4,date_created=9`.
impl FromStr for ExtractionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (name, index) = entry
                    .split_once('=')
                    .ok_or_else(|| format!("expected `name=index`, got `{entry}`"))?;
                let index = index
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| format!("invalid group index in `{entry}`: {e}"))?;
                Ok(FieldMapping {
                    name: name.trim().to_string(),
                    index,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;
        ExtractionRule::new(fields)
    }
}

impl fmt::Display for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .fields
            .iter()
            .map(|field| format!("{}={}", field.name, field.index))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&rendered)
    }
}

/// One structured record extracted from one log message. Fields keep rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    fields: Vec<(String, String)>,
}

impl ExtractedRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl Serialize for ExtractedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rule: ExtractionRule,
}

impl Extractor {
    #[must_use]
    pub fn new(rule: ExtractionRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &ExtractionRule {
        &self.rule
    }

    /// Extracts a record from `message`, or reports why it cannot.
    pub fn extract(&self, message: &str) -> Result<ExtractedRecord, ExtractionError> {
        let groups = parenthetical_groups(message);
        let insufficient = || ExtractionError {
            message: message.to_string(),
            reason: ExtractionFailure::InsufficientGroups {
                found: groups.len(),
                required: self.rule.required_groups(),
            },
        };

        let fields = self
            .rule
            .fields
            .iter()
            .map(|field| {
                groups
                    .get(field.index)
                    .map(|group| (field.name.clone(), inner(group).to_string()))
                    .ok_or_else(insufficient)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExtractedRecord { fields })
    }
}
