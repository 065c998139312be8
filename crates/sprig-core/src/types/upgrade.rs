//! Upgrade rules.
//!
//! The target ships a table of pattern-based rewrites. `package` rules
//! rename wildcard dependencies, `missingPackage` rules infer undeclared
//! dependencies from source text and `api` rules rewrite source files.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SprigError, SprigResult};

/// One rule as it appears in the target configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    /// pattern -> replacement
    #[serde(default)]
    pub map: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Package,
    MissingPackage,
    Api,
    /// Rule types this resolver does not act on
    #[serde(other)]
    Other,
}

/// Compiled, read-only view of the rule table
#[derive(Debug, Clone, Default)]
pub struct UpgradeRules {
    package: Vec<IndexMap<String, String>>,
    missing: Vec<(Regex, String)>,
    api: Vec<(Regex, String)>,
}

impl UpgradeRule {
    pub fn new<I, K, V>(kind: RuleKind, map: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            map: map.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl UpgradeRules {
    /// Compile the rule table; any invalid pattern is a configuration error
    pub fn compile(rules: &[UpgradeRule]) -> SprigResult<Self> {
        let mut compiled = UpgradeRules::default();

        for rule in rules {
            match rule.kind {
                RuleKind::Package => compiled.package.push(rule.map.clone()),
                RuleKind::MissingPackage => {
                    for (pattern, package) in &rule.map {
                        compiled.missing.push((compile_pattern(pattern)?, package.clone()));
                    }
                },
                RuleKind::Api => {
                    for (pattern, replacement) in &rule.map {
                        compiled.api.push((compile_pattern(pattern)?, replacement.clone()));
                    }
                },
                RuleKind::Other => {},
            }
        }

        Ok(compiled)
    }

    pub fn is_empty(&self) -> bool {
        self.package.is_empty() && self.missing.is_empty() && self.api.is_empty()
    }

    /// Rewrite a dependency id requested as `*`. An empty result means the
    /// dependency should be dropped.
    pub fn upgrade_package_reference(&self, package: &str, spec: &str) -> String {
        if spec != "*" {
            return package.to_string();
        }

        let mut upgraded = package.to_string();
        for rule in &self.package {
            for (pattern, replacement) in rule {
                if &upgraded == pattern {
                    upgraded = replacement.clone();
                }
            }
        }
        upgraded
    }

    /// Packages implied by `source` that `dependencies` does not declare
    pub fn missing_packages(
        &self,
        dependencies: &IndexMap<String, String>,
        source: &str,
    ) -> IndexMap<String, String> {
        let mut missing = IndexMap::new();
        if source.is_empty() {
            return missing;
        }

        for (pattern, package) in &self.missing {
            let declared = dependencies.get(package).map_or(false, |v| !v.is_empty());
            if !declared && pattern.is_match(source) {
                missing.insert(package.clone(), "*".to_string());
            }
        }
        missing
    }

    /// Whether `source` uses `package`, by its inference pattern if one
    /// exists, otherwise by a `<package>.` reference
    pub fn is_package_in_use(&self, package: &str, source: &str) -> bool {
        let inferred = self
            .missing
            .iter()
            .rev()
            .find(|(_, target)| target == package)
            .map(|(pattern, _)| pattern.is_match(source));

        match inferred {
            Some(found) => found,
            None => source.contains(&format!("{}.", package)),
        }
    }

    /// Apply every `api` rule to `contents`
    pub fn upgrade_api(&self, contents: &str) -> String {
        let mut updated = contents.to_string();
        for (pattern, replacement) in &self.api {
            updated = pattern.replace_all(&updated, replacement.as_str()).into_owned();
        }
        updated
    }
}

fn compile_pattern(pattern: &str) -> SprigResult<Regex> {
    Regex::new(pattern).map_err(|source| SprigError::InvalidRule {
        pattern: pattern.to_string(),
        source,
    })
}
