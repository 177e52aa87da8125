/*!

Weighted tabulation of survey responses, and the presentation rules that
turn the tabulated shares into chart-ready tables.

The pipeline has two stages:

1. [aggregate] (or the [builder::Aggregator] when several weight columns are
   involved) sums a weight column for every combination of the grouping
   columns, and turns the sums into shares of each partition.
2. [StyleBook::style] applies the presentation rule of a question and a
   survey year: excluded responses, display aliases, custom order and custom
   colors. [apply_demographic_rule] does the same for the demographic axis.

```
use mas_tabulation::*;

let records = vec![
    SurveyRecord::new("findjob", "Good time", 2025).with_weight("countywt", 3.0),
    SurveyRecord::new("findjob", "Bad time", 2025).with_weight("countywt", 1.0),
];
let rows = aggregate(&records, "countywt", &[GroupColumn::Response])?;

let mut book = StyleBook::new();
book.insert(
    "findjob",
    2025,
    StyleRule {
        custom_order: Some(vec!["Good time".to_string(), "Bad time".to_string()]),
        ..StyleRule::default()
    },
);
let chart = book.style(&rows, "findjob", 2025);
assert_eq!(chart.response_order, vec!["Good time", "Bad time"]);
assert_eq!(chart.rows[0].percent, 0.75);
# Ok::<(), TabulationErrors>(())
```
*/
mod config;
mod palette;
mod styling;

pub mod builder;
pub mod manual;
pub mod validation;

use log::{debug, info};

pub use crate::config::*;
pub use crate::styling::{apply_demographic_rule, style_rows};

use crate::builder::Aggregator;

/// Sums a weight column by the grouping columns and computes the share of
/// every row within its partition.
///
/// Arguments:
/// * `records` the records to tabulate, already restricted to one question
/// * `weight_column` the weight to sum
/// * `group_columns` the grouping columns. They must include the response.
///
/// An empty output means that no record matched: it is not an error.
pub fn aggregate<'a, I>(
    records: I,
    weight_column: &str,
    group_columns: &[GroupColumn],
) -> Result<Vec<AggregatedRow>, TabulationErrors>
where
    I: IntoIterator<Item = &'a SurveyRecord>,
{
    let mut agg = Aggregator::new(group_columns)?;
    agg.add_pass(records, weight_column)?;
    let rows = agg.finish();
    debug!(
        "aggregate: weight {:?} columns {:?}: {} rows",
        weight_column,
        group_columns,
        rows.len()
    );
    Ok(rows)
}

/// Styles the output of an aggregation, telling apart the absence of data
/// from a chart that the rules emptied.
pub fn chart_outcome(
    rows: &[AggregatedRow],
    book: &StyleBook,
    question: &str,
    rule_year: u32,
) -> ChartOutcome {
    if rows.is_empty() {
        info!(
            "chart_outcome: no data for question {:?} (rules of {})",
            question, rule_year
        );
        return ChartOutcome::NoData;
    }
    let chart = book.style(rows, question, rule_year);
    for d in chart.diagnostics.iter() {
        info!("chart_outcome: question {:?}: {}", question, d);
    }
    ChartOutcome::Chart(chart)
}
