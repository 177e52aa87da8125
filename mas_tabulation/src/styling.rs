use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

use crate::config::*;
use crate::palette::Palette;

impl StyleBook {
    /// Styles the rows of a chart with the rule of the given question and year.
    pub fn style(&self, rows: &[AggregatedRow], question: &str, year: u32) -> StyledChart {
        let rule = self.rule_for(question, year);
        if rule.defaulted {
            debug!(
                "style: no rule for question {:?} year {}, using the defaults",
                question, year
            );
        }
        style_rows(rows, rule.value)
    }
}

/// Applies a style rule to aggregated rows.
///
/// The steps always run in this order: exclusion, aliasing, ordering, coloring.
pub fn style_rows(rows: &[AggregatedRow], rule: &StyleRule) -> StyledChart {
    let mut diagnostics: Vec<StyleDiagnostic> = Vec::new();

    // 1. Exclusions
    let mut kept: Vec<AggregatedRow> = rows
        .iter()
        .filter(|r| !rule.excluded_responses.contains(&r.response))
        .cloned()
        .collect();
    if kept.is_empty() && !rows.is_empty() {
        diagnostics.push(StyleDiagnostic::AllRowsExcluded);
    }
    if rule.residual_mode == ResidualMode::Renormalize {
        renormalize(&mut kept);
    }

    // 2. Display labels
    let labels: Vec<String> = kept
        .iter()
        .map(|r| rule.display_label(&r.response).value.to_string())
        .collect();

    // 3. Ordering
    let sort_keys: Vec<usize> = match &rule.custom_order {
        Some(order) => custom_sort_keys(&kept, &labels, order, rule, &mut diagnostics),
        None => default_sort_keys(&kept, &labels),
    };

    // 4. Colors
    let colors = resolve_colors(&labels, &sort_keys, rule);

    let mut styled: Vec<StyledRow> = Vec::new();
    let rows_with_keys = kept.into_iter().zip(labels).zip(sort_keys).zip(colors);
    for (((row, label), sort_key), color) in rows_with_keys {
        styled.push(StyledRow {
            response: row.response,
            display_label: label,
            group_label: row.group.clone(),
            group: row.group,
            survey_year: row.survey_year,
            weight: row.weight,
            percent: row.percent,
            sort_key,
            group_sort_key: None,
            color: color.value,
            color_defaulted: color.defaulted,
        });
    }
    sort_rows(&mut styled);
    let response_order = response_order(&styled);

    StyledChart {
        rows: styled,
        response_order,
        group_order: Vec::new(),
        diagnostics,
    }
}

/// Applies the rule of a demographic axis: excluded groups, display names and
/// the canonical group order.
pub fn apply_demographic_rule(chart: StyledChart, rule: &DemographicRule) -> StyledChart {
    let StyledChart {
        rows,
        diagnostics: mut diags,
        ..
    } = chart;
    let had_rows = !rows.is_empty();

    let mut kept: Vec<StyledRow> = rows
        .into_iter()
        .filter(|r| match &r.group {
            Some(g) => !rule.excluded_groups.contains(g),
            None => true,
        })
        .collect();
    if had_rows && kept.is_empty() && !diags.contains(&StyleDiagnostic::AllRowsExcluded) {
        diags.push(StyleDiagnostic::AllRowsExcluded);
    }

    let group_keys = group_sort_keys(&kept, rule);
    for row in kept.iter_mut() {
        if let Some(g) = &row.group {
            row.group_label = Some(rule.group_label(g).value.to_string());
            row.group_sort_key = group_keys.get(g).cloned();
        }
    }
    sort_rows(&mut kept);

    let mut groups: Vec<(usize, String)> = kept
        .iter()
        .filter_map(|r| match (r.group_sort_key, &r.group_label) {
            (Some(k), Some(l)) => Some((k, l.clone())),
            _ => None,
        })
        .collect();
    groups.sort();
    groups.dedup();

    StyledChart {
        response_order: response_order(&kept),
        group_order: groups.into_iter().map(|(_, l)| l).collect(),
        rows: kept,
        diagnostics: diags,
    }
}

fn renormalize(rows: &mut [AggregatedRow]) {
    let mut totals: BTreeMap<(Option<String>, Option<u32>), f64> = BTreeMap::new();
    for r in rows.iter() {
        *totals
            .entry((r.group.clone(), r.survey_year))
            .or_insert(0.0) += r.percent;
    }
    for r in rows.iter_mut() {
        let total = totals
            .get(&(r.group.clone(), r.survey_year))
            .cloned()
            .unwrap_or(0.0);
        if total > 0.0 {
            r.percent /= total;
        }
    }
}

/// The position of every order entry, reachable from the entry itself and
/// from every raw response aliased to it. The first position wins.
fn order_positions<'a>(
    order: &'a [String],
    aliases: &'a BTreeMap<String, String>,
) -> HashMap<&'a str, usize> {
    let mut raw_by_alias: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
    for (raw, alias) in aliases.iter() {
        raw_by_alias
            .entry(alias.as_str())
            .or_default()
            .push(raw.as_str());
    }
    let mut res: HashMap<&str, usize> = HashMap::new();
    for (idx, entry) in order.iter().enumerate() {
        res.entry(entry.as_str()).or_insert(idx);
        if let Some(raws) = raw_by_alias.get(entry.as_str()) {
            for raw in raws {
                res.entry(*raw).or_insert(idx);
            }
        }
    }
    res
}

fn custom_sort_keys(
    rows: &[AggregatedRow],
    labels: &[String],
    order: &[String],
    rule: &StyleRule,
    diagnostics: &mut Vec<StyleDiagnostic>,
) -> Vec<usize> {
    let positions = order_positions(order, &rule.response_aliases);

    let lookup = |response: &str, label: &str| -> Option<usize> {
        positions
            .get(response)
            .or_else(|| positions.get(label))
            .cloned()
    };

    // Unordered responses go after the ordered ones, by label, and are reported.
    let mut unordered: BTreeMap<&str, &str> = BTreeMap::new();
    for (row, label) in rows.iter().zip(labels) {
        if lookup(&row.response, label).is_none() {
            unordered.entry(label.as_str()).or_insert(row.response.as_str());
        }
    }
    let mut unordered_keys: HashMap<&str, usize> = HashMap::new();
    for (idx, (label, response)) in unordered.iter().enumerate() {
        warn!(
            "style: response {:?} (displayed as {:?}) has no position in the custom order {:?}",
            response, label, order
        );
        diagnostics.push(StyleDiagnostic::UnorderedResponse {
            response: response.to_string(),
            display_label: label.to_string(),
        });
        unordered_keys.insert(*label, order.len() + idx);
    }

    rows.iter()
        .zip(labels)
        .map(|(row, label)| {
            lookup(&row.response, label)
                .or_else(|| unordered_keys.get(label.as_str()).cloned())
                .unwrap_or(order.len())
        })
        .collect()
}

/// Descending total share, then label.
fn default_sort_keys(rows: &[AggregatedRow], labels: &[String]) -> Vec<usize> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for (row, label) in rows.iter().zip(labels) {
        *totals.entry(label.as_str()).or_insert(0.0) += row.percent;
    }
    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|(l1, p1), (l2, p2)| {
        p2.partial_cmp(p1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| l1.cmp(l2))
    });
    let ranks: HashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(idx, (l, _))| (*l, idx))
        .collect();
    labels
        .iter()
        .map(|l| ranks.get(l.as_str()).cloned().unwrap_or(ranked.len()))
        .collect()
}

/// One color per display label, returned for every row. Configured colors
/// first, then the palette in display order.
fn resolve_colors(
    labels: &[String],
    sort_keys: &[usize],
    rule: &StyleRule,
) -> Vec<Resolved<String>> {
    let configured = rule.colors_by_label();
    let mut palette = Palette::new(configured.values());

    let mut in_order: Vec<(usize, &String)> = sort_keys.iter().cloned().zip(labels).collect();
    in_order.sort();
    in_order.dedup();

    // Every label of `labels` goes through this loop.
    let mut by_label: HashMap<&str, Resolved<String>> = HashMap::new();
    for (_, label) in in_order {
        if by_label.contains_key(label.as_str()) {
            continue;
        }
        let color = match configured.get(label) {
            Some(c) => Resolved::configured(c.clone()),
            None => {
                if rule.custom_colors.is_some() {
                    debug!("style: no configured color for {:?}, using the palette", label);
                }
                Resolved::fallback(palette.next_color())
            }
        };
        by_label.insert(label.as_str(), color);
    }
    labels
        .iter()
        .map(|l| by_label[l.as_str()].clone())
        .collect()
}

fn sort_rows(rows: &mut [StyledRow]) {
    rows.sort_by(|a, b| {
        a.sort_key
            .cmp(&b.sort_key)
            .then_with(|| a.group_sort_key.cmp(&b.group_sort_key))
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.survey_year.cmp(&b.survey_year))
            .then_with(|| a.response.cmp(&b.response))
    });
}

fn response_order(rows: &[StyledRow]) -> Vec<String> {
    let mut res: Vec<String> = Vec::new();
    for r in rows {
        if !res.contains(&r.display_label) {
            res.push(r.display_label.clone());
        }
    }
    res
}

fn group_sort_keys(rows: &[StyledRow], rule: &DemographicRule) -> HashMap<String, usize> {
    let mut groups: Vec<&String> = rows.iter().filter_map(|r| r.group.as_ref()).collect();
    groups.sort();
    groups.dedup();

    let mut positions: HashMap<&str, usize> = HashMap::new();
    if let Some(order) = &rule.group_order {
        for (idx, entry) in order.iter().enumerate() {
            positions.entry(entry.as_str()).or_insert(idx);
        }
    }
    let offset = rule.group_order.as_ref().map(|o| o.len()).unwrap_or(0);

    let mut res: HashMap<String, usize> = HashMap::new();
    let mut unlisted: Vec<(&str, &String)> = Vec::new();
    for g in groups {
        let label = rule.group_label(g).value;
        match positions.get(g.as_str()).or_else(|| positions.get(label)) {
            Some(idx) => {
                res.insert(g.clone(), *idx);
            }
            None => unlisted.push((label, g)),
        }
    }
    unlisted.sort();
    if rule.group_order.is_some() && !unlisted.is_empty() {
        debug!(
            "apply_demographic_rule: groups outside of the configured order: {:?}",
            unlisted
        );
    }
    for (idx, (_, g)) in unlisted.into_iter().enumerate() {
        res.insert(g.clone(), offset + idx);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn row(response: &str, percent: f64) -> AggregatedRow {
        AggregatedRow {
            response: response.to_string(),
            group: None,
            survey_year: None,
            weight: percent,
            percent,
        }
    }

    fn grouped(group: &str, response: &str, percent: f64) -> AggregatedRow {
        AggregatedRow {
            group: Some(group.to_string()),
            ..row(response, percent)
        }
    }

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exclusion_with_renormalization() {
        // 10, 5 and 2 (DK) in weights.
        let rows = vec![
            row("Bad time", 5.0 / 17.0),
            row("DK", 2.0 / 17.0),
            row("Good time", 10.0 / 17.0),
        ];
        let rule = StyleRule {
            excluded_responses: ["DK".to_string()].into_iter().collect(),
            residual_mode: ResidualMode::Renormalize,
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        assert_eq!(chart.rows.len(), 2);
        assert_eq!(chart.rows[0].response, "Good time");
        assert!((chart.rows[0].percent - 10.0 / 15.0).abs() < 1e-9);
        assert!((chart.rows[1].percent - 5.0 / 15.0).abs() < 1e-9);
        assert!(chart.rows.iter().all(|r| r.response != "DK"));
    }

    #[test]
    fn exclusion_keeps_the_residual() {
        let rows = vec![row("Bad time", 0.25), row("DK", 0.25), row("Good time", 0.5)];
        let rule = StyleRule {
            excluded_responses: ["DK".to_string()].into_iter().collect(),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        let total: f64 = chart.rows.iter().map(|r| r.percent).sum();
        assert_eq!(total, 0.75);
    }

    #[test]
    fn custom_order_without_gaps() {
        let rows = vec![row("Worse", 0.3), row("Better", 0.6)];
        let rule = StyleRule {
            custom_order: Some(strings(&["Better", "Same", "Worse"])),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        let order: Vec<&str> = chart.rows.iter().map(|r| r.response.as_str()).collect();
        assert_eq!(order, vec!["Better", "Worse"]);
        assert_eq!(chart.response_order, strings(&["Better", "Worse"]));
        assert!(chart.diagnostics.is_empty());
    }

    #[test]
    fn custom_order_matches_aliases() {
        let rows = vec![
            row("Put it on credit card", 0.2),
            row("Pay it with cash, check, or debit card", 0.5),
        ];
        let rule = StyleRule {
            response_aliases: [
                ("Put it on credit card", "Credit Card"),
                ("Pay it with cash, check, or debit card", "Cash, Check, or Debit"),
            ]
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
            custom_order: Some(strings(&["Cash, Check, or Debit", "Credit Card"])),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        let labels: Vec<&str> = chart
            .rows
            .iter()
            .map(|r| r.display_label.as_str())
            .collect();
        assert_eq!(labels, vec!["Cash, Check, or Debit", "Credit Card"]);
        assert!(chart.diagnostics.is_empty());
    }

    #[test]
    fn unordered_responses_are_reported() {
        let rows = vec![row("Traffic", 0.3), row("Environmental Pollution", 0.1)];
        let rule = StyleRule {
            custom_order: Some(strings(&["Housing Affordability", "Traffic"])),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        assert_eq!(chart.rows[0].response, "Traffic");
        assert_eq!(chart.rows[1].response, "Environmental Pollution");
        assert_eq!(
            chart.diagnostics,
            vec![StyleDiagnostic::UnorderedResponse {
                response: "Environmental Pollution".to_string(),
                display_label: "Environmental Pollution".to_string(),
            }]
        );
    }

    #[test]
    fn defaults_without_a_rule() {
        let book = StyleBook::new();
        let rows = vec![
            row("A", 0.1),
            row("B", 0.4),
            row("C", 0.2),
            row("D", 0.3),
        ];
        let chart = book.style(&rows, "lkahead", 2019);
        let percents: Vec<f64> = chart.rows.iter().map(|r| r.percent).collect();
        assert_eq!(percents, vec![0.4, 0.3, 0.2, 0.1]);
        let colors: HashSet<&String> = chart.rows.iter().map(|r| &r.color).collect();
        assert_eq!(colors.len(), 4);
        assert!(chart.rows.iter().all(|r| r.color_defaulted));
    }

    #[test]
    fn colors_follow_aliases() {
        let rows = vec![row("Providing more affordable housing options", 0.5), row("Other", 0.2)];
        let rule = StyleRule {
            response_aliases: [(
                "Providing more affordable housing options".to_string(),
                "Affordable housing".to_string(),
            )]
            .into_iter()
            .collect(),
            custom_colors: Some(
                [(
                    "Providing more affordable housing options".to_string(),
                    "#FE6100".to_string(),
                )]
                .into_iter()
                .collect(),
            ),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        assert_eq!(chart.rows[0].display_label, "Affordable housing");
        assert_eq!(chart.rows[0].color, "#FE6100");
        assert!(!chart.rows[0].color_defaulted);
        // Not configured: falls back to the palette.
        assert_eq!(chart.rows[1].color, "#1f77b4");
        assert!(chart.rows[1].color_defaulted);
    }

    #[test]
    fn one_color_per_label_across_groups() {
        let rows = vec![
            grouped("Cobb", "Yes", 0.5),
            grouped("Cobb", "No", 0.5),
            grouped("Henry", "Yes", 0.7),
            grouped("Henry", "No", 0.3),
        ];
        let chart = style_rows(&rows, &StyleRule::default());
        let yes: HashSet<&String> = chart
            .rows
            .iter()
            .filter(|r| r.response == "Yes")
            .map(|r| &r.color)
            .collect();
        assert_eq!(yes.len(), 1);
        assert_eq!(chart.response_order, strings(&["Yes", "No"]));
    }

    #[test]
    fn aliased_responses_share_a_palette_color() {
        let rows = vec![
            grouped("Cobb", "Yes, definitely", 0.4),
            grouped("Cobb", "No", 0.6),
            grouped("Henry", "Yes, probably", 0.5),
            grouped("Henry", "Maybe", 0.1),
        ];
        let rule = StyleRule {
            response_aliases: [
                ("Yes, definitely".to_string(), "Yes".to_string()),
                ("Yes, probably".to_string(), "Yes".to_string()),
            ]
            .into_iter()
            .collect(),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        assert_eq!(chart.rows.len(), 4);
        let mut by_label: HashMap<&str, HashSet<&str>> = HashMap::new();
        for r in chart.rows.iter() {
            assert!(r.color_defaulted);
            by_label
                .entry(r.display_label.as_str())
                .or_default()
                .insert(r.color.as_str());
        }
        assert!(by_label.values().all(|colors| colors.len() == 1));
        let distinct: HashSet<&str> = by_label.values().flatten().cloned().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn everything_excluded() {
        let rows = vec![row("DK", 1.0)];
        let rule = StyleRule {
            excluded_responses: ["DK".to_string()].into_iter().collect(),
            ..StyleRule::default()
        };
        let chart = style_rows(&rows, &rule);
        assert!(chart.rows.is_empty());
        assert_eq!(chart.diagnostics, vec![StyleDiagnostic::AllRowsExcluded]);
    }

    #[test]
    fn demographic_axis() {
        let rows = vec![
            grouped("white", "Yes", 0.5),
            grouped("black", "Yes", 0.6),
            grouped("DK", "Yes", 0.1),
            grouped("other", "Yes", 0.2),
        ];
        let rule = DemographicRule {
            excluded_groups: ["DK".to_string()].into_iter().collect(),
            group_order: Some(strings(&["black", "white", "other"])),
            group_rename: [("black", "Black"), ("white", "White"), ("other", "Other")]
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        };
        let chart = apply_demographic_rule(style_rows(&rows, &StyleRule::default()), &rule);
        assert_eq!(chart.group_order, strings(&["Black", "White", "Other"]));
        let groups: Vec<&str> = chart
            .rows
            .iter()
            .filter_map(|r| r.group_label.as_deref())
            .collect();
        assert_eq!(groups, vec!["Black", "White", "Other"]);
    }

    #[test]
    fn unlisted_groups_come_last() {
        let rows = vec![
            grouped("Zeta", "Yes", 0.5),
            grouped("Alpha", "Yes", 0.5),
            grouped("Listed", "Yes", 0.5),
        ];
        let rule = DemographicRule {
            group_order: Some(strings(&["Listed"])),
            ..DemographicRule::default()
        };
        let chart = apply_demographic_rule(style_rows(&rows, &StyleRule::default()), &rule);
        assert_eq!(chart.group_order, strings(&["Listed", "Alpha", "Zeta"]));
    }

    #[test]
    fn styling_is_idempotent() {
        let rows = vec![
            grouped("Cobb", "Yes", 0.5),
            grouped("Cobb", "No", 0.5),
            grouped("Henry", "No", 0.3),
        ];
        let rule = StyleRule::default();
        assert_eq!(style_rows(&rows, &rule), style_rows(&rows, &rule));
    }
}
