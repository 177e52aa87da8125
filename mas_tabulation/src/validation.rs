//! Checks that run once, when the configuration and the dataset are loaded,
//! rather than on every chart.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::config::*;

/// A questionable entry in a style rule.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RuleIssue {
    /// Several raw responses are displayed with the same label.
    AliasCollision { label: String, responses: Vec<String> },
    /// The entry is the raw value of one response and the alias of another.
    AmbiguousOrderEntry {
        entry: String,
        raw_response: String,
        aliased_response: String,
    },
    DuplicateOrderEntry { entry: String },
    /// Two entries of the order resolve to the same raw response (usually the
    /// raw value and its alias are both listed).
    ResponseOrderedTwice {
        response: String,
        entries: Vec<String>,
    },
}

impl Display for RuleIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleIssue::AliasCollision { label, responses } => {
                write!(f, "responses {:?} share the label {:?}", responses, label)
            }
            RuleIssue::AmbiguousOrderEntry {
                entry,
                raw_response,
                aliased_response,
            } => write!(
                f,
                "order entry {:?} is both the response {:?} and the alias of {:?}",
                entry, raw_response, aliased_response
            ),
            RuleIssue::DuplicateOrderEntry { entry } => {
                write!(f, "order entry {:?} is listed more than once", entry)
            }
            RuleIssue::ResponseOrderedTwice { response, entries } => write!(
                f,
                "response {:?} is ordered by several entries: {:?}",
                response, entries
            ),
        }
    }
}

pub fn validate_rule(rule: &StyleRule) -> Vec<RuleIssue> {
    let mut res: Vec<RuleIssue> = Vec::new();

    let mut raw_by_alias: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (raw, alias) in rule.response_aliases.iter() {
        raw_by_alias
            .entry(alias.as_str())
            .or_default()
            .push(raw.as_str());
    }
    for (label, raws) in raw_by_alias.iter() {
        if raws.len() > 1 {
            res.push(RuleIssue::AliasCollision {
                label: label.to_string(),
                responses: raws.iter().map(|s| s.to_string()).collect(),
            });
        }
    }

    if let Some(order) = &rule.custom_order {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for entry in order.iter() {
            if !seen.insert(entry.as_str()) {
                res.push(RuleIssue::DuplicateOrderEntry {
                    entry: entry.clone(),
                });
                continue;
            }
            if !rule.response_aliases.contains_key(entry.as_str()) {
                continue;
            }
            if let Some(raws) = raw_by_alias.get(entry.as_str()) {
                for other in raws.iter().filter(|r| **r != entry.as_str()) {
                    res.push(RuleIssue::AmbiguousOrderEntry {
                        entry: entry.clone(),
                        raw_response: entry.clone(),
                        aliased_response: other.to_string(),
                    });
                }
            }
        }

        for (raw, alias) in rule.response_aliases.iter() {
            if raw == alias {
                continue;
            }
            let raw_pos = order.iter().position(|e| e == raw);
            let alias_pos = order.iter().position(|e| e == alias);
            if let (Some(i), Some(j)) = (raw_pos, alias_pos) {
                let mut entries = vec![(i, raw.clone()), (j, alias.clone())];
                entries.sort();
                res.push(RuleIssue::ResponseOrderedTwice {
                    response: raw.clone(),
                    entries: entries.into_iter().map(|(_, e)| e).collect(),
                });
            }
        }
    }
    res
}

/// A dataset condition that breaks the nested geography tabulation.
#[derive(PartialEq, Debug, Clone)]
pub enum NestedGeographyIssue {
    /// Records whose demographic column already holds the nested label. They
    /// are dropped by the general pass.
    LabelInDemographicColumn { count: usize },
    /// Members of the nested area without the alternate weight.
    MemberWithoutWeight { count: usize },
    /// Respondents outside of the nested area that carry alternate weight:
    /// the two samples overlap in a way the tabulation cannot see.
    NonMemberWithWeight { count: usize, total_weight: f64 },
}

impl Display for NestedGeographyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NestedGeographyIssue::LabelInDemographicColumn { count } => write!(
                f,
                "{} records already use the nested label in the demographic column",
                count
            ),
            NestedGeographyIssue::MemberWithoutWeight { count } => {
                write!(f, "{} members have no alternate weight", count)
            }
            NestedGeographyIssue::NonMemberWithWeight {
                count,
                total_weight,
            } => write!(
                f,
                "{} non-members carry {} of alternate weight",
                count, total_weight
            ),
        }
    }
}

/// Checks the assumptions of the nested geography pass against a dataset.
pub fn check_nested_geography<'a, I>(records: I, nested: &NestedGeography) -> Vec<NestedGeographyIssue>
where
    I: IntoIterator<Item = &'a SurveyRecord>,
{
    let mut labelled: usize = 0;
    let mut unweighted_members: usize = 0;
    let mut weighted_outsiders: usize = 0;
    let mut outsider_weight: f64 = 0.0;
    for record in records {
        if record.attribute(&nested.demographic_column) == Some(nested.label.as_str()) {
            labelled += 1;
        }
        let w = record
            .weight(&nested.weight_column)
            .filter(|x| x.is_finite());
        if nested.is_member(record) {
            if w.is_none() {
                unweighted_members += 1;
            }
        } else if let Some(x) = w.filter(|x| *x > 0.0) {
            weighted_outsiders += 1;
            outsider_weight += x;
        }
    }

    let mut res: Vec<NestedGeographyIssue> = Vec::new();
    if labelled > 0 {
        res.push(NestedGeographyIssue::LabelInDemographicColumn { count: labelled });
    }
    if unweighted_members > 0 {
        res.push(NestedGeographyIssue::MemberWithoutWeight {
            count: unweighted_members,
        });
    }
    if weighted_outsiders > 0 {
        res.push(NestedGeographyIssue::NonMemberWithWeight {
            count: weighted_outsiders,
            total_weight: outsider_weight,
        });
    }
    res
}
