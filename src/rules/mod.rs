pub mod operator;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::{LongboxError, Result};
use crate::domain::Comic;

pub use operator::{ComicField, Operator};

/// A single predicate over one comic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    pub target_property: ComicField,
    pub operator: Operator,
    pub target_value: String,
}

impl Rule {
    /// Build a rule from raw names. Fails on an unknown field or operator
    /// so a corrupt definition surfaces at construction, not evaluation.
    pub fn new(name: &str, target_property: &str, operator: &str, target_value: &str) -> Result<Self> {
        let target_property = ComicField::from_name(target_property).ok_or_else(|| {
            LongboxError::RuleDefinition(format!("unknown comic field '{target_property}'"))
        })?;
        let operator = Operator::from_name(operator).ok_or_else(|| {
            LongboxError::RuleDefinition(format!("unknown operator '{operator}'"))
        })?;
        Ok(Self {
            name: name.to_string(),
            target_property,
            operator,
            target_value: target_value.to_string(),
        })
    }

    pub fn matches(&self, comic: &Comic) -> bool {
        self.operator
            .apply(&self.target_property.value_of(comic), &self.target_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Any,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    None,
    Watch,
    Pull,
}

/// One node of the rule tree: a leaf predicate or a nested group.
///
/// Distinguished by shape when deserializing — a group carries
/// `groupType`, a rule carries `operator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Rule(Rule),
    Group(RuleGroup),
}

impl RuleNode {
    /// Truthiness of this node against a comic. A nested group counts as
    /// truthy when its own apply matched, whether or not its result type
    /// marked anything.
    pub fn evaluate(&self, comic: &mut Comic) -> bool {
        match self {
            Self::Rule(rule) => rule.matches(comic),
            Self::Group(group) => group.apply(comic),
        }
    }
}

/// A named boolean group of rules and sub-groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroup {
    #[serde(default)]
    pub name: String,
    pub group_type: GroupType,
    pub result_type: ResultType,
    #[serde(default)]
    pub allow_reprints: bool,
    #[serde(default)]
    pub rules: Vec<RuleNode>,
}

impl Default for RuleGroup {
    fn default() -> Self {
        Self {
            name: String::new(),
            group_type: GroupType::Any,
            result_type: ResultType::None,
            allow_reprints: false,
            rules: Vec::new(),
        }
    }
}

impl RuleGroup {
    /// Walk the group against one comic, marking pulled/watched per the
    /// group's result type. Returns whether the group matched.
    ///
    /// Any-groups mark on the first truthy child and evaluate nothing
    /// after it; all-groups stop at the first falsy child and mark only
    /// when every child held. A reprint is gated out entirely unless the
    /// group allows reprints.
    pub fn apply(&self, comic: &mut Comic) -> bool {
        if comic.reprint && !self.allow_reprints {
            return false;
        }

        match self.group_type {
            GroupType::Any => {
                for node in &self.rules {
                    if node.evaluate(comic) {
                        self.mark(comic);
                        return true;
                    }
                }
                false
            }
            GroupType::All => {
                for node in &self.rules {
                    if !node.evaluate(comic) {
                        return false;
                    }
                }
                self.mark(comic);
                true
            }
        }
    }

    fn mark(&self, comic: &mut Comic) {
        match self.result_type {
            ResultType::Pull => comic.pulled = true,
            ResultType::Watch => comic.watched = true,
            ResultType::None => {}
        }
    }
}

/// The user's rule file: exactly one root group, stored as JSON.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    pub root: RuleGroup,
}

impl RuleSet {
    pub fn new(root: RuleGroup) -> Self {
        Self { root }
    }

    /// Load a rule set, or write a default no-op one when the file does
    /// not exist yet.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let set = Self::new(RuleGroup {
                name: "My rules".into(),
                ..RuleGroup::default()
            });
            set.save(path)?;
            return Ok(set);
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let root: RuleGroup = serde_json::from_str(&raw)
            .map_err(|e| LongboxError::RuleDefinition(format!("{}: {e}", path.display())))?;
        Ok(Self { root })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.root)
            .map_err(|e| LongboxError::RuleDefinition(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Classify one top-level comic. Returns whether the root matched.
    pub fn apply(&self, comic: &mut Comic) -> bool {
        self.root.apply(comic)
    }
}
