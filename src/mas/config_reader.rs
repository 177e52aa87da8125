use crate::mas::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::collections::{BTreeMap, BTreeSet};

/// The configuration shipped with the program.
const DEFAULT_CONFIG: &str = include_str!("../../config/mas_charts.json");

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    pub question: String,
    pub response: String,
    pub survey_year: String,
    pub weights: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NestedGeographyConfig {
    /// The name of a configured demographic, not a dataset column.
    pub demographic: String,
    pub label: String,
    pub member_column: String,
    pub member_value: String,
    pub weight_column: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub code: String,
    pub text: String,
    #[serde(default)]
    pub trend: bool,
}

impl QuestionConfig {
    /// The label shown in question lists.
    pub fn display_text(&self) -> String {
        let marker = if self.trend {
            "(Trend Available)"
        } else {
            "(No Trend)"
        };
        format!("{} {}", self.text, marker)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DemographicConfig {
    pub name: String,
    pub column: String,
    pub excluded_groups: Option<Vec<String>>,
    pub group_order: Option<Vec<String>>,
    pub group_rename: Option<BTreeMap<String, String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ChartRuleConfig {
    pub exclude_responses: Option<Vec<String>>,
    pub response_aliases: Option<BTreeMap<String, String>>,
    pub custom_order: Option<Vec<String>>,
    pub custom_colors: Option<BTreeMap<String, String>>,
    pub residual: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MasConfig {
    pub columns: ColumnsConfig,
    pub default_weight: String,
    pub trend_rule_year: String,
    pub nested_geography: Option<NestedGeographyConfig>,
    pub questions: Vec<QuestionConfig>,
    pub demographics: Vec<DemographicConfig>,
    /// question code -> four-digit year -> rule
    pub charts: BTreeMap<String, BTreeMap<String, ChartRuleConfig>>,
}

/// A demographic axis, with the column it reads and its presentation rule.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Demographic {
    pub name: String,
    pub column: String,
    pub rule: DemographicRule,
}

impl Demographic {
    /// Finds the raw group for a group given either raw or renamed.
    pub fn raw_group<'a>(&'a self, group: &'a str) -> &'a str {
        if self.rule.group_rename.contains_key(group) {
            return group;
        }
        self.rule
            .group_rename
            .iter()
            .find(|(_, label)| label.as_str() == group)
            .map(|(raw, _)| raw.as_str())
            .unwrap_or(group)
    }
}

/// The validated configuration, expressed with the tabulation types.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub columns: ColumnsConfig,
    pub default_weight: String,
    pub trend_rule_year: u32,
    /// The nested geography and the name of the demographic it belongs to.
    pub nested: Option<(String, NestedGeography)>,
    pub questions: Vec<QuestionConfig>,
    pub demographics: Vec<Demographic>,
    pub book: StyleBook,
    /// Configuration issues found at load time. They are not fatal.
    pub issues: Vec<String>,
}

impl Dashboard {
    /// Finds a question by code or by text.
    pub fn question(&self, name: &str) -> Option<&QuestionConfig> {
        self.questions
            .iter()
            .find(|q| q.code == name)
            .or_else(|| self.questions.iter().find(|q| q.text == name))
    }

    pub fn demographic(&self, name: &str) -> Option<&Demographic> {
        self.demographics.iter().find(|d| d.name == name)
    }

    /// The nested geography, if it belongs to this demographic.
    pub fn nested_for(&self, demographic: &str) -> Option<&NestedGeography> {
        match &self.nested {
            Some((name, nested)) if name == demographic => Some(nested),
            _ => None,
        }
    }

    /// The year whose rules style the trend charts of a question.
    ///
    /// Falls back to the most recent configured year when the question has no
    /// rule for the trend year.
    pub fn trend_rule_year(&self, question: &str) -> u32 {
        if !self.book.rule_for(question, self.trend_rule_year).defaulted {
            return self.trend_rule_year;
        }
        match self.book.years_for(question).first() {
            Some(y) => {
                debug!(
                    "trend_rule_year: no {} rule for {:?}, using {}",
                    self.trend_rule_year, question, y
                );
                *y
            }
            None => self.trend_rule_year,
        }
    }
}

pub fn read_config(path: &str) -> MasResult<MasConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

pub fn default_config() -> MasResult<MasConfig> {
    serde_json::from_str(DEFAULT_CONFIG).context(ParsingJsonSnafu {
        path: "<built-in configuration>",
    })
}

pub fn read_reference(path: &str) -> MasResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_reference: {} charts", js["charts"].as_array().map(|a| a.len()).unwrap_or(0));
    Ok(js)
}

fn parse_year(s: &str, entry: &str) -> MasResult<u32> {
    ensure!(
        s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()),
        InvalidYearKeySnafu { key: s, entry }
    );
    s.parse::<u32>()
        .ok()
        .context(InvalidYearKeySnafu { key: s, entry })
}

fn parse_residual(residual: &Option<String>) -> MasResult<ResidualMode> {
    match residual.as_deref() {
        None | Some("keep") => Ok(ResidualMode::Keep),
        Some("renormalize") => Ok(ResidualMode::Renormalize),
        Some(x) => UnknownResidualSnafu {
            residual: x.to_string(),
        }
        .fail(),
    }
}

fn make_rule(rc: &ChartRuleConfig) -> MasResult<StyleRule> {
    Ok(StyleRule {
        excluded_responses: rc
            .exclude_responses
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<String>>(),
        response_aliases: rc.response_aliases.clone().unwrap_or_default(),
        custom_order: rc.custom_order.clone(),
        custom_colors: rc.custom_colors.clone(),
        residual_mode: parse_residual(&rc.residual)?,
    })
}

fn make_demographic(dc: &DemographicConfig) -> Demographic {
    Demographic {
        name: dc.name.clone(),
        column: dc.column.clone(),
        rule: DemographicRule {
            excluded_groups: dc.excluded_groups.iter().flatten().cloned().collect(),
            group_order: dc.group_order.clone(),
            group_rename: dc.group_rename.clone().unwrap_or_default(),
        },
    }
}

/// Checks the configuration and converts it to the tabulation types.
pub fn validate_config(config: &MasConfig) -> MasResult<Dashboard> {
    let trend_rule_year = parse_year(&config.trend_rule_year, "trend_rule_year")?;

    if !config.columns.weights.contains(&config.default_weight) {
        whatever!(
            "The default weight {:?} is not one of the weight columns {:?}",
            config.default_weight,
            config.columns.weights
        );
    }

    let mut book = StyleBook::new();
    let mut issues: Vec<String> = Vec::new();
    for (question, by_year) in config.charts.iter() {
        for (year_key, rc) in by_year.iter() {
            let year = parse_year(year_key, question)?;
            let rule = make_rule(rc)?;
            for issue in validate_rule(&rule).iter() {
                let msg = format!("chart {} {}: {}", question, year_key, issue);
                warn!("validate_config: {}", msg);
                issues.push(msg);
            }
            book.insert(question, year, rule);
        }
    }

    let demographics: Vec<Demographic> = config.demographics.iter().map(make_demographic).collect();
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for d in demographics.iter() {
        if !names.insert(d.name.as_str()) {
            whatever!("The demographic {:?} is configured more than once", d.name);
        }
    }

    let nested = match &config.nested_geography {
        Some(ng) => {
            let demo = demographics
                .iter()
                .find(|d| d.name == ng.demographic)
                .context(UnknownDemographicSnafu {
                    demographic: ng.demographic.clone(),
                })?;
            if !config.columns.weights.contains(&ng.weight_column) {
                whatever!(
                    "The nested geography weight {:?} is not one of the weight columns {:?}",
                    ng.weight_column,
                    config.columns.weights
                );
            }
            Some((
                demo.name.clone(),
                NestedGeography {
                    demographic_column: demo.column.clone(),
                    label: ng.label.clone(),
                    member_column: ng.member_column.clone(),
                    member_value: ng.member_value.clone(),
                    weight_column: ng.weight_column.clone(),
                },
            ))
        }
        None => None,
    };

    for question in config.charts.keys() {
        if !config.questions.iter().any(|q| &q.code == question) {
            debug!(
                "validate_config: chart rules for {:?}, which is not in the question list",
                question
            );
        }
    }

    info!(
        "validate_config: {} questions, {} demographics, {} issues",
        config.questions.len(),
        demographics.len(),
        issues.len()
    );
    Ok(Dashboard {
        columns: config.columns.clone(),
        default_weight: config.default_weight.clone(),
        trend_rule_year,
        nested,
        questions: config.questions.clone(),
        demographics,
        book,
        issues,
    })
}
