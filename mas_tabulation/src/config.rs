// ********* Input data structures ***********

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::Display;

/// One respondent-question observation, as loaded from the dataset.
///
/// Weights and demographic attributes are kept by column name because the
/// set of columns changes from one survey wave to the next.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyRecord {
    pub question: String,
    pub response: String,
    pub survey_year: u32,
    pub weights: BTreeMap<String, f64>,
    pub attributes: BTreeMap<String, String>,
}

impl SurveyRecord {
    pub fn new(question: &str, response: &str, survey_year: u32) -> SurveyRecord {
        SurveyRecord {
            question: question.to_string(),
            response: response.to_string(),
            survey_year,
            weights: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_weight(mut self, column: &str, value: f64) -> SurveyRecord {
        self.weights.insert(column.to_string(), value);
        self
    }

    pub fn with_attribute(mut self, column: &str, value: &str) -> SurveyRecord {
        self.attributes.insert(column.to_string(), value.to_string());
        self
    }

    pub fn weight(&self, column: &str) -> Option<f64> {
        self.weights.get(column).cloned()
    }

    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(|s| s.as_str())
    }
}

/// The columns a tabulation can be grouped by.
///
/// `Response` must always be present. At most one `Attribute` is accepted.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum GroupColumn {
    Response,
    SurveyYear,
    /// A demographic attribute column, such as `county` or `income`.
    Attribute(String),
}

/// A sub-area whose respondents are a subset of a larger area's sample and
/// which is tabulated with its own weight column.
///
/// For Metro Atlanta Speaks, this is the City of Atlanta inside the county
/// level `Jurisdiction` breakdown.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NestedGeography {
    /// The demographic attribute column the nested area is reported under.
    pub demographic_column: String,
    /// The value the nested area takes in that column.
    pub label: String,
    /// The attribute that flags a respondent as living in the nested area.
    pub member_column: String,
    pub member_value: String,
    /// The alternate weight column.
    pub weight_column: String,
}

impl NestedGeography {
    pub fn is_member(&self, record: &SurveyRecord) -> bool {
        record.attribute(&self.member_column) == Some(self.member_value.as_str())
    }
}

// ******** Output data structures *********

/// The summed weight for one combination of the grouping columns.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregatedRow {
    pub response: String,
    /// The value of the demographic column, if the tabulation is grouped by one.
    pub group: Option<String>,
    pub survey_year: Option<u32>,
    pub weight: f64,
    /// Share of the partition: all the rows with the same group and year.
    pub percent: f64,
}

/// The result of a lookup that may fall back to a default.
///
/// `defaulted` tells apart a value that was configured from one that was
/// filled in because no configuration covered it.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Resolved<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Resolved<T> {
    pub fn configured(value: T) -> Resolved<T> {
        Resolved {
            value,
            defaulted: false,
        }
    }

    pub fn fallback(value: T) -> Resolved<T> {
        Resolved {
            value,
            defaulted: true,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct StyledRow {
    pub response: String,
    pub display_label: String,
    pub group: Option<String>,
    pub group_label: Option<String>,
    pub survey_year: Option<u32>,
    pub weight: f64,
    pub percent: f64,
    pub sort_key: usize,
    pub group_sort_key: Option<usize>,
    pub color: String,
    /// True when the color came from the automatic palette.
    pub color_defaulted: bool,
}

/// Problems found while styling. None of them stop the chart from being
/// produced, but all of them are worth showing to whoever maintains the
/// configuration.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StyleDiagnostic {
    /// A custom order is configured but this response matches none of its entries.
    UnorderedResponse {
        response: String,
        display_label: String,
    },
    /// Data was present, but the exclusions removed every row.
    AllRowsExcluded,
}

impl Display for StyleDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleDiagnostic::UnorderedResponse {
                response,
                display_label,
            } => write!(
                f,
                "response {:?} (displayed as {:?}) is missing from the custom order",
                response, display_label
            ),
            StyleDiagnostic::AllRowsExcluded => write!(f, "all the rows were excluded"),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct StyledChart {
    pub rows: Vec<StyledRow>,
    /// Display labels of the responses, in legend and stacking order.
    pub response_order: Vec<String>,
    /// Display labels of the demographic groups, in axis order. Empty when the
    /// chart has no demographic axis.
    pub group_order: Vec<String>,
    pub diagnostics: Vec<StyleDiagnostic>,
}

/// What a render request gets back.
#[derive(PartialEq, Debug, Clone)]
pub enum ChartOutcome {
    /// No record matched the selection.
    NoData,
    Chart(StyledChart),
}

/// Errors that prevent a tabulation from being set up.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationErrors {
    MissingResponseColumn,
    DuplicateColumn(GroupColumn),
    MultipleDemographicColumns,
    NestedPassWithoutDemographic,
}

impl Error for TabulationErrors {}

impl Display for TabulationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulationErrors::MissingResponseColumn => {
                write!(f, "the group columns must include the response")
            }
            TabulationErrors::DuplicateColumn(c) => {
                write!(f, "the group column {:?} is listed more than once", c)
            }
            TabulationErrors::MultipleDemographicColumns => {
                write!(f, "only one demographic column can be grouped at a time")
            }
            TabulationErrors::NestedPassWithoutDemographic => write!(
                f,
                "a nested geography pass requires a demographic group column"
            ),
        }
    }
}

// ********* Configuration **********

/// What happens to the share of the excluded responses.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum ResidualMode {
    /// Excluded responses stay in the denominator: the remaining percentages
    /// sum to less than 100%, the rest being "Don't Know" or not available.
    #[default]
    Keep,
    /// The surviving responses are rescaled to sum to 100% in each partition.
    Renormalize,
}

/// Presentation rules for one question in one survey year.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StyleRule {
    pub excluded_responses: BTreeSet<String>,
    pub response_aliases: BTreeMap<String, String>,
    pub custom_order: Option<Vec<String>>,
    pub custom_colors: Option<BTreeMap<String, String>>,
    pub residual_mode: ResidualMode,
}

impl StyleRule {
    /// The label shown for a raw response.
    pub fn display_label<'a>(&'a self, response: &'a str) -> Resolved<&'a str> {
        match self.response_aliases.get(response) {
            Some(alias) => Resolved::configured(alias.as_str()),
            None => Resolved::fallback(response),
        }
    }

    /// The configured colors, keyed by display label.
    ///
    /// Colors may be written against the raw response or against its alias.
    /// When both are present, the first key in alphabetical order wins.
    pub fn colors_by_label(&self) -> BTreeMap<String, String> {
        let mut res: BTreeMap<String, String> = BTreeMap::new();
        if let Some(colors) = &self.custom_colors {
            for (key, color) in colors.iter() {
                let label = self.display_label(key).value.to_string();
                res.entry(label).or_insert_with(|| color.clone());
            }
        }
        res
    }
}

/// Presentation rules for a demographic axis (for example `Income`).
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DemographicRule {
    pub excluded_groups: BTreeSet<String>,
    pub group_order: Option<Vec<String>>,
    pub group_rename: BTreeMap<String, String>,
}

impl DemographicRule {
    pub fn group_label<'a>(&'a self, group: &'a str) -> Resolved<&'a str> {
        match self.group_rename.get(group) {
            Some(label) => Resolved::configured(label.as_str()),
            None => Resolved::fallback(group),
        }
    }
}

/// All the style rules, keyed by question code and four-digit year.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StyleBook {
    rules: HashMap<String, BTreeMap<String, StyleRule>>,
    default_rule: StyleRule,
}

impl StyleBook {
    pub fn new() -> StyleBook {
        StyleBook::default()
    }

    pub fn insert(&mut self, question: &str, year: u32, rule: StyleRule) {
        self.rules
            .entry(question.to_string())
            .or_default()
            .insert(year_key(year), rule);
    }

    /// The rule for a question and year, or the default rule if none is configured.
    pub fn rule_for(&self, question: &str, year: u32) -> Resolved<&StyleRule> {
        match self
            .rules
            .get(question)
            .and_then(|by_year| by_year.get(&year_key(year)))
        {
            Some(rule) => Resolved::configured(rule),
            None => Resolved::fallback(&self.default_rule),
        }
    }

    /// The years that have a rule for this question, most recent first.
    pub fn years_for(&self, question: &str) -> Vec<u32> {
        let mut years: Vec<u32> = self
            .rules
            .get(question)
            .map(|by_year| by_year.keys().filter_map(|k| k.parse().ok()).collect())
            .unwrap_or_default();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years
    }
}

fn year_key(year: u32) -> String {
    format!("{:04}", year)
}
