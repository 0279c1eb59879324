//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Query optimizer rule toggles.
//!
//! A toggle list is an ordered sequence of `+rule` and `-rule` entries. The
//! list is evaluated left to right and the last entry that mentions a rule
//! wins. The pseudo-rule `all` mentions every rule that can be switched, so
//! `["-all", "+use-indexes"]` disables everything except `use-indexes`, while
//! `["+use-indexes", "-all"]` disables `use-indexes` too.

use std::fmt;
use std::result::Result;

use crate::error::{ia_err, DriverError};

/// Name of the pseudo-rule that addresses every toggleable rule.
pub const ALL_RULES: &str = "all";

/// One `+rule` or `-rule` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleToggle {
    pub(crate) name: String,
    pub(crate) enable: bool,
}

impl RuleToggle {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_enable(&self) -> bool {
        self.enable
    }
    fn matches(&self, rule: &str) -> bool {
        self.name == rule || self.name == ALL_RULES
    }
}

impl fmt::Display for RuleToggle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.enable { '+' } else { '-' };
        write!(f, "{}{}", sign, self.name)
    }
}

/// Description of one optimizer rule, as reported by the server's rule
/// catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub name: String,
    pub enabled_by_default: bool,
    /// Rules that cannot be disabled ignore every toggle, including `-all`.
    pub can_be_disabled: bool,
}

/// An ordered list of optimizer rule toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerRules {
    toggles: Vec<RuleToggle>,
}

impl OptimizerRules {
    pub fn new() -> OptimizerRules {
        OptimizerRules::default()
    }

    /// Parse a list of `+rule`/`-rule` strings, keeping their order.
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<OptimizerRules, DriverError> {
        let mut r = OptimizerRules::new();
        for s in rules {
            r.toggles.push(parse_toggle(s.as_ref())?);
        }
        Ok(r)
    }

    /// Append `+rule`.
    pub fn enable(mut self, rule: &str) -> Result<Self, DriverError> {
        validate_name(rule)?;
        self.toggles.push(RuleToggle {
            name: rule.to_string(),
            enable: true,
        });
        Ok(self)
    }

    /// Append `-rule`.
    pub fn disable(mut self, rule: &str) -> Result<Self, DriverError> {
        validate_name(rule)?;
        self.toggles.push(RuleToggle {
            name: rule.to_string(),
            enable: false,
        });
        Ok(self)
    }

    pub fn toggles(&self) -> &[RuleToggle] {
        &self.toggles
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }

    /// The list in wire format, e.g. `["-all", "+use-indexes"]`.
    pub fn to_strings(&self) -> Vec<String> {
        self.toggles.iter().map(|t| t.to_string()).collect()
    }

    /// Whether a toggleable `rule` ends up enabled, given its default state.
    pub fn is_enabled(&self, rule: &str, enabled_by_default: bool) -> bool {
        self.toggles
            .iter()
            .filter(|t| t.matches(rule))
            .last()
            .map(|t| t.enable)
            .unwrap_or(enabled_by_default)
    }

    /// Names of the catalogue rules enabled after applying this list, in
    /// catalogue order.
    pub fn apply<'a>(&self, catalog: &'a [RuleInfo]) -> Vec<&'a str> {
        catalog
            .iter()
            .filter(|r| {
                if !r.can_be_disabled {
                    return r.enabled_by_default;
                }
                self.is_enabled(&r.name, r.enabled_by_default)
            })
            .map(|r| r.name.as_str())
            .collect()
    }
}

fn parse_toggle(s: &str) -> Result<RuleToggle, DriverError> {
    let (enable, name) = match s.chars().next() {
        Some('+') => (true, &s[1..]),
        Some('-') => (false, &s[1..]),
        _ => return ia_err!("optimizer rule '{}' must start with '+' or '-'", s),
    };
    validate_name(name)?;
    Ok(RuleToggle {
        name: name.to_string(),
        enable,
    })
}

fn validate_name(name: &str) -> Result<(), DriverError> {
    if name.is_empty() {
        return ia_err!("optimizer rule name must not be empty");
    }
    if name.starts_with(['+', '-']) || name.chars().any(char::is_whitespace) {
        return ia_err!("invalid optimizer rule name '{}'", name);
    }
    Ok(())
}
