//! Specialist profile model: the schema every profile document maps onto.
//!
//! A profile declares which domains it covers (tags), how it ranks options
//! per category, what its answers look like (template skeleton), and what it
//! exchanges with other specialists (collaboration contract).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::text::tokenize;

/// A validated specialist profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier within the registry.
    pub id: String,

    /// Human-readable summary (display only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Domain tags this profile covers. Treated as a set, order kept for display.
    pub tags: Vec<String>,

    /// Ranked preferences, one entry per category.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rankings: Vec<CategoryRanking>,

    /// Ordered response-template skeleton.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template: Vec<TemplateSection>,

    /// What this profile offers to and expects from its collaborators.
    #[serde(default)]
    pub contract: CollaborationContract,
}

/// An ordered list of options for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRanking {
    /// Category name, e.g. "datastore".
    pub category: String,

    /// When true, the options form a set of equally acceptable choices.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unordered: bool,

    /// Options, best first (unless `unordered`).
    pub options: Vec<RankedOption>,
}

/// One option in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

/// A named slot in the response template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub name: String,

    #[serde(default = "default_true")]
    pub required: bool,

    /// The preference category this section renders, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Provides/requires lists used to gate multi-profile handoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaborationContract {
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Profile {
    /// Validate the profile against the schema invariants.
    ///
    /// Registry-level checks (duplicate identifiers) happen in the registry.
    pub fn validate(&self) -> Result<()> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(Error::validation("(empty)", "profile identifier cannot be empty"));
        }
        let fail = |reason: String| Err(Error::validation(id, reason));
        if id != self.id {
            return fail("profile identifier cannot have surrounding whitespace".into());
        }

        if self.tags.is_empty() {
            return fail("tag set cannot be empty".into());
        }
        // Tags are compared as token phrases, the form requests are matched in.
        let mut seen = HashSet::new();
        for tag in &self.tags {
            if normalize_key(tag).is_empty() {
                return fail("tags cannot be empty".into());
            }
            let phrase = tokenize(tag);
            if phrase.is_empty() {
                return fail(format!("tag '{tag}' contains no matchable word"));
            }
            if !seen.insert(phrase.join(" ")) {
                return fail(format!("duplicate tag '{tag}'"));
            }
        }

        let mut categories = HashSet::new();
        for ranking in &self.rankings {
            let key = normalize_key(&ranking.category);
            if key.is_empty() {
                return fail("category name cannot be empty".into());
            }
            if !categories.insert(key) {
                return fail(format!("duplicate category '{}'", ranking.category));
            }
            if ranking.options.is_empty() {
                return fail(format!("ranking for category '{}' is empty", ranking.category));
            }
            let mut options = HashSet::new();
            for option in &ranking.options {
                let key = normalize_key(&option.name);
                if key.is_empty() {
                    return fail(format!(
                        "option names in category '{}' cannot be empty",
                        ranking.category
                    ));
                }
                if !options.insert(key) {
                    return fail(format!(
                        "option '{}' appears twice in category '{}'",
                        option.name, ranking.category
                    ));
                }
            }
        }

        let mut sections = HashSet::new();
        for section in &self.template {
            let key = normalize_key(&section.name);
            if key.is_empty() {
                return fail("template section names cannot be empty".into());
            }
            if !sections.insert(key) {
                return fail(format!("duplicate template section '{}'", section.name));
            }
        }

        for item in self.contract.provides.iter().chain(&self.contract.requires) {
            if normalize_key(item).is_empty() {
                return fail("contract items cannot be empty".into());
            }
        }

        Ok(())
    }

    /// Look up the ranking for a category (case-insensitive).
    pub fn ranking(&self, category: &str) -> Option<&CategoryRanking> {
        let key = normalize_key(category);
        self.rankings
            .iter()
            .find(|r| normalize_key(&r.category) == key)
    }

    /// Required template sections, in declaration order.
    pub fn required_sections(&self) -> impl Iterator<Item = &TemplateSection> {
        self.template.iter().filter(|s| s.required)
    }
}

impl CategoryRanking {
    /// 1-based rank of an option in this ranking. Unordered sets rank every
    /// member first.
    pub fn rank_of(&self, option: &str) -> Option<usize> {
        let key = normalize_key(option);
        self.options
            .iter()
            .position(|o| normalize_key(&o.name) == key)
            .map(|pos| if self.unordered { 1 } else { pos + 1 })
    }

    /// The rank given to options this ranking does not mention.
    pub fn worst_rank(&self) -> usize {
        if self.unordered { 2 } else { self.options.len() + 1 }
    }

    pub fn top(&self) -> Option<&RankedOption> {
        self.options.first()
    }

    pub fn option(&self, name: &str) -> Option<&RankedOption> {
        let key = normalize_key(name);
        self.options.iter().find(|o| normalize_key(&o.name) == key)
    }
}

/// Canonical comparison key: trimmed, lower-cased, inner whitespace collapsed.
///
/// Used for tags, category and section names, and contract items.
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
