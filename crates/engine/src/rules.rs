//! Keyword fallback rules.
//!
//! Last resort before `Uncategorized`: when no model is published (or the
//! model's answer falls below the confidence threshold), a small table of
//! merchant keywords still catches the obvious cases. Users can replace
//! the stock table with their own TOML rule file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRule {
    pub category: String,
    pub pattern: String,
    #[serde(default)]
    pub match_type: RuleMatchType,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleMatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<FallbackRule>,
}

/// Pairing of a rule with its precompiled regex (if applicable).
#[derive(Debug)]
struct CompiledRule {
    rule: FallbackRule,
    compiled_regex: Option<regex::Regex>,
}

#[derive(Debug)]
pub struct KeywordRuleEngine {
    rules: Vec<CompiledRule>,
}

/// Stock keyword table; matches as `Contains` against the lowercased
/// description.
const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Groceries", &["supermarket", "grocery", "costco"]),
    ("Restaurants", &["restaurant", "cafe", "coffee", "pizza"]),
    ("Transportation", &["uber", "taxi", "gas", "parking", "lyft"]),
    ("Shopping", &["amzn", "store", "shop", "outlet", "mall"]),
    ("Health", &["pharmacy", "doctor", "hospital", "clinic"]),
    ("Entertainment", &["cinema", "movies", "concert", "spotify", "netflix"]),
    ("Utilities", &["electricity", "water", "internet", "phone", "hydro"]),
    ("Rent", &["rent"]),
    ("Income", &["salary", "payroll", "paycheque"]),
    ("Investment", &["brokerage", "investment", "tfsa", "rrsp"]),
];

impl KeywordRuleEngine {
    pub fn new(rules: Vec<FallbackRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if rule.match_type == RuleMatchType::Regex {
                    regex::Regex::new(&rule.pattern).ok()
                } else {
                    None
                };
                CompiledRule {
                    rule,
                    compiled_regex,
                }
            })
            .collect();
        // Highest priority first; first match wins.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    /// The built-in keyword table.
    pub fn stock() -> Self {
        let rules = DEFAULT_KEYWORDS
            .iter()
            .flat_map(|(category, keywords)| {
                keywords.iter().map(|keyword| FallbackRule {
                    category: (*category).to_string(),
                    pattern: (*keyword).to_string(),
                    match_type: RuleMatchType::Contains,
                    priority: 0,
                })
            })
            .collect();
        Self::new(rules)
    }

    /// Parse a `[[rules]]` TOML table.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let file: RuleFile =
            toml::from_str(content).map_err(|e| format!("Failed to parse rules TOML: {e}"))?;
        Ok(Self::new(file.rules))
    }

    /// First matching rule's category for a raw description.
    pub fn find_category(&self, description: &str) -> Option<&str> {
        let text = description.to_lowercase();
        self.rules
            .iter()
            .find(|cr| Self::rule_matches(cr, description, &text))
            .map(|cr| cr.rule.category.as_str())
    }

    fn rule_matches(cr: &CompiledRule, raw: &str, lowered: &str) -> bool {
        match cr.rule.match_type {
            RuleMatchType::Contains => lowered.contains(&cr.rule.pattern.to_lowercase()),
            RuleMatchType::Exact => lowered == cr.rule.pattern.to_lowercase(),
            RuleMatchType::Regex => cr
                .compiled_regex
                .as_ref()
                .is_some_and(|re| re.is_match(raw)),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for KeywordRuleEngine {
    fn default() -> Self {
        Self::stock()
    }
}
