pub use crate::config::*;

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

/// A builder for weighted tabulations that draw from more than one sample.
///
/// Each pass sums its own weight column. All the passes are unioned before
/// the percentages are computed, so normalization happens exactly once.
///
/// ```
/// use mas_tabulation::builder::Aggregator;
/// use mas_tabulation::{GroupColumn, SurveyRecord};
/// # use mas_tabulation::TabulationErrors;
///
/// let county = vec![
///     SurveyRecord::new("move", "Stay", 2025)
///         .with_attribute("county", "Cobb")
///         .with_weight("countywt", 3.0),
///     SurveyRecord::new("move", "Move out", 2025)
///         .with_attribute("county", "Cobb")
///         .with_weight("countywt", 1.0),
/// ];
/// let city = vec![SurveyRecord::new("move", "Stay", 2025).with_weight("atlwt", 2.0)];
///
/// let mut agg = Aggregator::new(&[
///     GroupColumn::Attribute("county".to_string()),
///     GroupColumn::Response,
/// ])?;
/// agg.add_pass(&county, "countywt")?;
/// agg.add_nested_pass(&city, "atlwt", "Atlanta")?;
/// let rows = agg.finish();
///
/// assert_eq!(rows.len(), 3);
/// # Ok::<(), TabulationErrors>(())
/// ```
pub struct Aggregator<'a> {
    pub(crate) _demographic: Option<String>,
    pub(crate) _by_year: bool,
    pub(crate) _passes: Vec<Pass<'a>>,
}

pub(crate) struct Pass<'a> {
    records: Vec<&'a SurveyRecord>,
    weight_column: String,
    // Set for nested geography passes: every record lands in this group.
    fixed_group: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
struct RowKey {
    group: Option<String>,
    survey_year: Option<u32>,
    response: String,
}

impl RowKey {
    fn partition(&self) -> (Option<String>, Option<u32>) {
        (self.group.clone(), self.survey_year)
    }
}

impl<'a> Aggregator<'a> {
    pub fn new(columns: &[GroupColumn]) -> Result<Aggregator<'a>, TabulationErrors> {
        let mut seen: Vec<&GroupColumn> = Vec::new();
        for c in columns {
            if seen.contains(&c) {
                return Err(TabulationErrors::DuplicateColumn(c.clone()));
            }
            seen.push(c);
        }
        if !columns.contains(&GroupColumn::Response) {
            return Err(TabulationErrors::MissingResponseColumn);
        }
        let demographics: Vec<&String> = columns
            .iter()
            .filter_map(|c| match c {
                GroupColumn::Attribute(name) => Some(name),
                _ => None,
            })
            .collect();
        let demographic = match demographics.as_slice() {
            [] => None,
            [name] => Some((*name).clone()),
            _ => return Err(TabulationErrors::MultipleDemographicColumns),
        };
        Ok(Aggregator {
            _demographic: demographic,
            _by_year: columns.contains(&GroupColumn::SurveyYear),
            _passes: Vec::new(),
        })
    }

    /// Adds records whose group is read from the demographic column.
    pub fn add_pass<I>(&mut self, records: I, weight_column: &str) -> Result<(), TabulationErrors>
    where
        I: IntoIterator<Item = &'a SurveyRecord>,
    {
        self._passes.push(Pass {
            records: records.into_iter().collect(),
            weight_column: weight_column.to_string(),
            fixed_group: None,
        });
        Ok(())
    }

    /// Adds the records of a nested geography, all reported under `group_label`
    /// and weighted with their own column.
    ///
    /// Rows of the regular passes that carry the same label are dropped: the
    /// nested pass is the only source for that group.
    pub fn add_nested_pass<I>(
        &mut self,
        records: I,
        weight_column: &str,
        group_label: &str,
    ) -> Result<(), TabulationErrors>
    where
        I: IntoIterator<Item = &'a SurveyRecord>,
    {
        if self._demographic.is_none() {
            return Err(TabulationErrors::NestedPassWithoutDemographic);
        }
        self._passes.push(Pass {
            records: records.into_iter().collect(),
            weight_column: weight_column.to_string(),
            fixed_group: Some(group_label.to_string()),
        });
        Ok(())
    }

    /// Sums all the passes and normalizes each partition.
    ///
    /// Rows come out sorted by group, then year, then response.
    pub fn finish(self) -> Vec<AggregatedRow> {
        let nested_labels: BTreeSet<String> = self
            ._passes
            .iter()
            .filter_map(|p| p.fixed_group.clone())
            .collect();

        let mut sums: BTreeMap<RowKey, f64> = BTreeMap::new();
        let mut shadowed: usize = 0;
        for pass in self._passes.iter() {
            for record in pass.records.iter() {
                let group = match (&pass.fixed_group, &self._demographic) {
                    (Some(label), _) => Some(label.clone()),
                    (None, Some(col)) => match record.attribute(col) {
                        Some(v) if nested_labels.contains(v) => {
                            shadowed += 1;
                            continue;
                        }
                        Some(v) => Some(v.to_string()),
                        // Missing values never form a group.
                        None => continue,
                    },
                    (None, None) => None,
                };
                let key = RowKey {
                    group,
                    survey_year: if self._by_year {
                        Some(record.survey_year)
                    } else {
                        None
                    },
                    response: record.response.clone(),
                };
                let w = match record.weight(&pass.weight_column) {
                    Some(x) if x.is_finite() => x,
                    _ => 0.0,
                };
                *sums.entry(key).or_insert(0.0) += w;
            }
        }
        if shadowed > 0 {
            warn!(
                "Aggregator: {} records carry a nested geography label in their demographic column and were left to the nested pass",
                shadowed
            );
        }

        let mut totals: BTreeMap<(Option<String>, Option<u32>), f64> = BTreeMap::new();
        for (key, w) in sums.iter() {
            *totals.entry(key.partition()).or_insert(0.0) += *w;
        }

        let mut res: Vec<AggregatedRow> = Vec::new();
        for (key, w) in sums.into_iter() {
            let total = totals.get(&key.partition()).cloned().unwrap_or(0.0);
            let percent = if total > 0.0 {
                w / total
            } else {
                warn!(
                    "Aggregator: partition {:?} has no weight, reporting 0%",
                    key.partition()
                );
                0.0
            };
            res.push(AggregatedRow {
                response: key.response,
                group: key.group,
                survey_year: key.survey_year,
                weight: w,
                percent,
            });
        }
        debug!("Aggregator::finish: {} rows", res.len());
        res
    }
}
