use log::{debug, info, warn};

use mas_tabulation::builder::Aggregator;
use mas_tabulation::validation::{check_nested_geography, validate_rule};
use mas_tabulation::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod dataset;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod session;

use crate::mas::config_reader::*;
use crate::mas::dataset::*;
use crate::mas::session::SessionContext;

#[derive(Debug, Snafu)]
pub enum MasError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the output"))]
    SerializingJson { source: serde_json::Error },

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet {worksheet:?}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display(
        "Excel file {path} has several worksheets {names:?}: pass --excel-worksheet-name"
    ))]
    AmbiguousWorksheet { path: String, names: Vec<String> },
    #[snafu(display("File {path} has no content"))]
    EmptyInput { path: String },
    #[snafu(display("Column {column:?} is missing from the header of {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Line {lineno}: {content:?} is not a survey year"))]
    InvalidSurveyYear { lineno: usize, content: String },
    #[snafu(display("Line {lineno}: {content:?} is not a valid weight for {column}"))]
    InvalidWeight {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Line {lineno}, column {column}: error cell {content}"))]
    ExcelWrongCellType {
        lineno: usize,
        column: usize,
        content: String,
    },
    #[snafu(display("Unknown input type {input_type:?}"))]
    UnknownInputType { input_type: String },
    #[snafu(display("No dataset: pass one with --input"))]
    MissingInput {},

    #[snafu(display("{key:?} is not a four-digit year (in {entry})"))]
    InvalidYearKey { key: String, entry: String },
    #[snafu(display("Unknown residual mode {residual:?}: expected keep or renormalize"))]
    UnknownResidual { residual: String },
    #[snafu(display("Unknown question {question:?}"))]
    UnknownQuestion { question: String },
    #[snafu(display("Unknown demographic {demographic:?}"))]
    UnknownDemographic { demographic: String },
    #[snafu(display(
        "Unknown chart {chart:?}: expected summary, trend, breakdown or group-trend"
    ))]
    UnknownChart { chart: String },
    #[snafu(display("No trend is available for question {question:?}"))]
    TrendUnavailable { question: String },
    #[snafu(display("The {chart} chart needs a {what}"))]
    MissingSelection { chart: String, what: String },
    #[snafu(display("Failed to set up the tabulation"))]
    Tabulation { source: TabulationErrors },

    #[snafu(display("{count} configuration issues (strict mode)"))]
    StrictConfig { count: usize },
    #[snafu(display("{count} dataset issues (strict mode)"))]
    StrictDataset { count: usize },
    #[snafu(display("{count} chart diagnostics (strict mode)"))]
    StrictDiagnostics { count: usize },
    #[snafu(display("Difference detected between the charts and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type MasResult<T> = Result<T, MasError>;

pub type BMasResult<T> = Result<T, Box<MasError>>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChartKind {
    Summary,
    Trend,
    Breakdown,
    GroupTrend,
}

impl ChartKind {
    pub fn parse(name: &str) -> MasResult<ChartKind> {
        match name {
            "summary" => Ok(ChartKind::Summary),
            "trend" => Ok(ChartKind::Trend),
            "breakdown" => Ok(ChartKind::Breakdown),
            "group-trend" => Ok(ChartKind::GroupTrend),
            _ => UnknownChartSnafu { chart: name }.fail(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Summary => "summary",
            ChartKind::Trend => "trend",
            ChartKind::Breakdown => "breakdown",
            ChartKind::GroupTrend => "group-trend",
        }
    }

    fn needs_demographic(&self) -> bool {
        matches!(self, ChartKind::Breakdown | ChartKind::GroupTrend)
    }
}

/// A computed chart, with the selection it was computed for.
#[derive(PartialEq, Debug, Clone)]
pub struct ChartReport {
    pub kind: ChartKind,
    pub question: String,
    pub year: Option<u32>,
    pub demographic: Option<String>,
    pub group: Option<String>,
    pub outcome: ChartOutcome,
}

/// One question in one year, grouped by response.
pub fn summary_chart(
    dashboard: &Dashboard,
    data: &Dataset,
    question: &str,
    year: u32,
) -> MasResult<ChartOutcome> {
    let records = data.records_for(question, year);
    let rows = aggregate(records, &dashboard.default_weight, &[GroupColumn::Response])
        .context(TabulationSnafu {})?;
    Ok(chart_outcome(&rows, &dashboard.book, question, year))
}

/// One question across all the survey years, styled with a single rule so
/// that all the years share the same legend.
pub fn trend_chart(
    dashboard: &Dashboard,
    data: &Dataset,
    question: &QuestionConfig,
) -> MasResult<ChartOutcome> {
    ensure!(
        question.trend,
        TrendUnavailableSnafu {
            question: question.code.clone()
        }
    );
    let records = data.question_records(&question.code);
    let rows = aggregate(
        records,
        &dashboard.default_weight,
        &[GroupColumn::SurveyYear, GroupColumn::Response],
    )
    .context(TabulationSnafu {})?;
    let rule_year = dashboard.trend_rule_year(&question.code);
    Ok(chart_outcome(&rows, &dashboard.book, &question.code, rule_year))
}

/// One question in one year, split by the groups of a demographic.
///
/// The nested geography is added as its own group, drawn from its members
/// and weighted with its own column.
pub fn breakdown_chart(
    dashboard: &Dashboard,
    data: &Dataset,
    question: &str,
    year: u32,
    demographic: &Demographic,
) -> MasResult<ChartOutcome> {
    let records = data.records_for(question, year);
    let mut agg = Aggregator::new(&[
        GroupColumn::Attribute(demographic.column.clone()),
        GroupColumn::Response,
    ])
    .context(TabulationSnafu {})?;
    agg.add_pass(records.iter().cloned(), &dashboard.default_weight)
        .context(TabulationSnafu {})?;
    if let Some(nested) = dashboard.nested_for(&demographic.name) {
        let members: Vec<&SurveyRecord> = records
            .iter()
            .cloned()
            .filter(|r| nested.is_member(r))
            .collect();
        debug!(
            "breakdown_chart: {} members of {:?} for {:?} {}",
            members.len(),
            nested.label,
            question,
            year
        );
        agg.add_nested_pass(members, &nested.weight_column, &nested.label)
            .context(TabulationSnafu {})?;
    }
    let rows = agg.finish();
    Ok(match chart_outcome(&rows, &dashboard.book, question, year) {
        ChartOutcome::NoData => ChartOutcome::NoData,
        ChartOutcome::Chart(chart) => {
            ChartOutcome::Chart(apply_demographic_rule(chart, &demographic.rule))
        }
    })
}

/// The trend of one demographic group. The group may be given raw or renamed.
pub fn group_trend_chart(
    dashboard: &Dashboard,
    data: &Dataset,
    question: &QuestionConfig,
    demographic: &Demographic,
    group: &str,
) -> MasResult<ChartOutcome> {
    ensure!(
        question.trend,
        TrendUnavailableSnafu {
            question: question.code.clone()
        }
    );
    let raw = demographic.raw_group(group);
    if demographic.rule.excluded_groups.contains(raw) {
        warn!(
            "group_trend_chart: the group {:?} is excluded from the {} charts",
            raw, demographic.name
        );
    }
    let records = data.question_records(&question.code);
    let (selected, weight_column): (Vec<&SurveyRecord>, &str) =
        match dashboard.nested_for(&demographic.name) {
            Some(nested) if nested.label == raw => (
                records.into_iter().filter(|r| nested.is_member(r)).collect(),
                nested.weight_column.as_str(),
            ),
            _ => (
                records
                    .into_iter()
                    .filter(|r| r.attribute(&demographic.column) == Some(raw))
                    .collect(),
                dashboard.default_weight.as_str(),
            ),
        };
    debug!(
        "group_trend_chart: {} records for {:?}, weighted with {}",
        selected.len(),
        raw,
        weight_column
    );
    let rows = aggregate(
        selected,
        weight_column,
        &[GroupColumn::SurveyYear, GroupColumn::Response],
    )
    .context(TabulationSnafu {})?;
    let rule_year = dashboard.trend_rule_year(&question.code);
    Ok(chart_outcome(&rows, &dashboard.book, &question.code, rule_year))
}

fn styled_row_to_json(row: &StyledRow) -> JSValue {
    json!({
        "response": row.response,
        "label": row.display_label,
        "group": row.group,
        "groupLabel": row.group_label,
        "year": row.survey_year,
        "weight": row.weight,
        "percent": row.percent,
        "color": row.color,
        "colorDefaulted": row.color_defaulted,
    })
}

fn chart_to_json(report: &ChartReport) -> JSValue {
    let mut js = json!({
        "chart": report.kind.name(),
        "question": report.question,
        "year": report.year,
        "demographic": report.demographic,
        "group": report.group,
    });
    match &report.outcome {
        ChartOutcome::NoData => {
            js["status"] = json!("noData");
            js["responseOrder"] = json!([]);
            js["groupOrder"] = json!([]);
            js["rows"] = json!([]);
            js["diagnostics"] = json!([]);
        }
        ChartOutcome::Chart(chart) => {
            let rows: Vec<JSValue> = chart.rows.iter().map(styled_row_to_json).collect();
            let diagnostics: Vec<String> =
                chart.diagnostics.iter().map(|d| d.to_string()).collect();
            js["status"] = json!("ok");
            js["responseOrder"] = json!(chart.response_order);
            js["groupOrder"] = json!(chart.group_order);
            js["rows"] = JSValue::Array(rows);
            js["diagnostics"] = json!(diagnostics);
        }
    }
    js
}

fn chart_kinds(names: &[String], question: &QuestionConfig) -> MasResult<Vec<ChartKind>> {
    if names.is_empty() {
        let mut res = vec![ChartKind::Summary];
        if question.trend {
            res.push(ChartKind::Trend);
        }
        return Ok(res);
    }
    names.iter().map(|n| ChartKind::parse(n)).collect()
}

/// Computes the requested charts.
///
/// Returns the JSON document and the session to keep for the next run.
pub fn render(
    args: &Args,
    dashboard: &Dashboard,
    data: &Dataset,
    session: &SessionContext,
) -> MasResult<(JSValue, SessionContext)> {
    let question = session.question(args.question.as_deref(), dashboard)?;
    let years = data.years_for(&question.code);
    let year = session.year(args.year, &years);
    let kinds = chart_kinds(&args.chart, question)?;
    let demographic = if args.demographic.is_some() || kinds.iter().any(|k| k.needs_demographic())
    {
        Some(session.demographic(args.demographic.as_deref(), dashboard)?)
    } else {
        None
    };
    info!(
        "render: question {:?} year {:?} demographic {:?} charts {:?}",
        question.code,
        year,
        demographic.map(|d| d.name.as_str()),
        kinds
    );

    let mut reports: Vec<ChartReport> = Vec::new();
    for kind in kinds {
        let report = match (kind, demographic) {
            (ChartKind::Summary, _) => ChartReport {
                kind,
                question: question.code.clone(),
                year,
                demographic: None,
                group: None,
                outcome: match year {
                    Some(y) => summary_chart(dashboard, data, &question.code, y)?,
                    None => ChartOutcome::NoData,
                },
            },
            (ChartKind::Trend, _) => ChartReport {
                kind,
                question: question.code.clone(),
                year: None,
                demographic: None,
                group: None,
                outcome: trend_chart(dashboard, data, question)?,
            },
            (ChartKind::Breakdown, Some(demo)) => ChartReport {
                kind,
                question: question.code.clone(),
                year,
                demographic: Some(demo.name.clone()),
                group: None,
                outcome: match year {
                    Some(y) => breakdown_chart(dashboard, data, &question.code, y, demo)?,
                    None => ChartOutcome::NoData,
                },
            },
            (ChartKind::GroupTrend, Some(demo)) => {
                let group = args.group.as_deref().context(MissingSelectionSnafu {
                    chart: kind.name(),
                    what: "group",
                })?;
                let raw = demo.raw_group(group);
                ChartReport {
                    kind,
                    question: question.code.clone(),
                    year: None,
                    demographic: Some(demo.name.clone()),
                    group: Some(demo.rule.group_label(raw).value.to_string()),
                    outcome: group_trend_chart(dashboard, data, question, demo, group)?,
                }
            }
            (_, None) => {
                return MissingSelectionSnafu {
                    chart: kind.name(),
                    what: "demographic",
                }
                .fail()
            }
        };
        reports.push(report);
    }

    let num_diagnostics: usize = reports
        .iter()
        .map(|r| match &r.outcome {
            ChartOutcome::Chart(c) => c.diagnostics.len(),
            ChartOutcome::NoData => 0,
        })
        .sum();
    if num_diagnostics > 0 {
        warn!("render: {} chart diagnostics", num_diagnostics);
        ensure!(
            !args.strict,
            StrictDiagnosticsSnafu {
                count: num_diagnostics
            }
        );
    }

    let charts: Vec<JSValue> = reports.iter().map(chart_to_json).collect();
    let new_session = session.updated(&question.code, year, demographic.map(|d| d.name.as_str()));
    Ok((json!({ "charts": charts }), new_session))
}

/// One line per question: code, text with the trend marker, and the years
/// with data (or with a rule, without a dataset).
fn question_lines(dashboard: &Dashboard, data: Option<&Dataset>) -> Vec<String> {
    dashboard
        .questions
        .iter()
        .map(|q| {
            let years = match data {
                Some(ds) => ds.years_for(&q.code),
                None => dashboard.book.years_for(&q.code),
            };
            let years_s: Vec<String> = years.iter().map(|y| y.to_string()).collect();
            format!("{}\t{}\t[{}]", q.code, q.display_text(), years_s.join(", "))
        })
        .collect()
}

fn list_questions(dashboard: &Dashboard, data: Option<&Dataset>) {
    for line in question_lines(dashboard, data) {
        println!("{}", line);
    }
}

fn check_dataset(dashboard: &Dashboard, data: &Dataset, strict: bool) -> MasResult<()> {
    let nested = match &dashboard.nested {
        Some((_, nested)) => nested,
        None => {
            info!("check_dataset: no nested geography configured");
            return Ok(());
        }
    };
    let issues = check_nested_geography(&data.records, nested);
    for issue in issues.iter() {
        warn!("check_dataset: {}: {}", nested.label, issue);
    }
    if issues.is_empty() {
        info!("check_dataset: no issue found");
    }
    ensure!(
        !strict || issues.is_empty(),
        StrictDatasetSnafu {
            count: issues.len()
        }
    );
    Ok(())
}

fn write_output(out: Option<&str>, pretty: &str) -> MasResult<()> {
    match out {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty);
            Ok(())
        }
        Some(path) => {
            info!("write_output: writing charts to {}", path);
            fs::write(path, pretty).context(WritingFileSnafu { path })
        }
    }
}

fn compare_with_reference(reference_path: &str, pretty_js: &str) -> MasResult<()> {
    let reference = read_reference(reference_path)?;
    let pretty_ref = serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    if pretty_ref != pretty_js {
        warn!("Found differences with the reference");
        print_diff(pretty_ref.as_str(), pretty_js, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("compare_with_reference: the charts match {}", reference_path);
    Ok(())
}

pub fn run(args: &Args) -> MasResult<()> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => default_config()?,
    };
    let dashboard = validate_config(&config)?;
    if !dashboard.issues.is_empty() && args.strict {
        return StrictConfigSnafu {
            count: dashboard.issues.len(),
        }
        .fail();
    }

    let session = match &args.session {
        Some(path) => SessionContext::load(path)?,
        None => SessionContext::default(),
    };

    if args.check_dataset {
        // The check reads the file as it is on disk, never a cached copy.
        dataset_cache().clear();
    }
    let data = match &args.input {
        Some(path) => {
            let source = DatasetSource {
                path: path.clone(),
                input_type: InputType::parse(args.input_type.as_deref(), path)?,
                worksheet: args.excel_worksheet_name.clone(),
                columns: dashboard.columns.clone(),
            };
            Some(
                dataset_cache()
                    .get_or_load(&source, read_dataset)
                    .map_err(|e| *e)?,
            )
        }
        None => None,
    };

    if args.list_questions {
        list_questions(&dashboard, data.as_deref());
        return Ok(());
    }

    let data = data.context(MissingInputSnafu {})?;
    if args.check_dataset {
        check_dataset(&dashboard, &data, args.strict)?;
    }

    let (charts_js, new_session) = render(args, &dashboard, &data, &session)?;
    let pretty_js = serde_json::to_string_pretty(&charts_js).context(SerializingJsonSnafu {})?;
    write_output(args.out.as_deref(), &pretty_js)?;

    if let Some(path) = &args.session {
        new_session.save(path)?;
    }

    // The reference, if provided for comparison
    if let Some(reference_path) = &args.reference {
        compare_with_reference(reference_path, &pretty_js)?;
    }
    Ok(())
}

#[cfg(test)]
fn fixture_path(test_name: &str, suffix: &str) -> String {
    let test_dir = option_env!("MAS_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    format!("{}/{}/{}_{}", test_dir, test_name, test_name, suffix)
}

#[cfg(test)]
fn run_fixture(
    test_name: &str,
    data_file: &str,
    reference_file: &str,
    selection: &[&str],
) -> MasResult<()> {
    use clap::Parser;

    let _ = env_logger::builder().is_test(true).try_init();
    info!("Running test {}", test_name);
    let config = fixture_path(test_name, "config.json");
    let input = fixture_path(test_name, data_file);
    let reference = fixture_path(test_name, reference_file);
    let mut cmd: Vec<&str> = vec![
        "masdash",
        "--config",
        config.as_str(),
        "--input",
        input.as_str(),
        "--reference",
        reference.as_str(),
    ];
    cmd.extend_from_slice(selection);
    run(&Args::parse_from(cmd))
}

#[cfg(test)]
fn test_wrapper(test_name: &str, selection: &[&str]) {
    use snafu::ErrorCompat;

    let res = run_fixture(test_name, "data.csv", "expected.json", selection);
    if let Err(e) = &res {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        }
    }
    assert!(res.is_ok(), "test {} failed", test_name);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard() -> Dashboard {
        validate_config(&default_config().unwrap()).unwrap()
    }

    fn member(response: &str, year: u32, countywt: f64, atlwt: f64) -> SurveyRecord {
        SurveyRecord::new("findjob", response, year)
            .with_attribute("county", "Fulton")
            .with_attribute("atlanta resident", "Yes")
            .with_weight("countywt", countywt)
            .with_weight("atlwt", atlwt)
    }

    fn resident(county: &str, response: &str, year: u32, countywt: f64) -> SurveyRecord {
        SurveyRecord::new("findjob", response, year)
            .with_attribute("county", county)
            .with_attribute("atlanta resident", "No")
            .with_weight("countywt", countywt)
    }

    fn dataset(dashboard: &Dashboard) -> Dataset {
        Dataset {
            source: DatasetSource {
                path: "memory".to_string(),
                input_type: InputType::Csv,
                worksheet: None,
                columns: dashboard.columns.clone(),
            },
            records: vec![
                resident("Cobb", "Good time", 2025, 3.0),
                resident("Cobb", "Bad time", 2025, 1.0),
                resident("Fulton", "Bad time", 2025, 2.0),
                member("Good time", 2025, 2.0, 1.0),
                member("Bad time", 2025, 4.0, 3.0),
                member("Good time", 2024, 1.0, 1.0),
            ],
        }
    }

    fn chart(outcome: ChartOutcome) -> StyledChart {
        match outcome {
            ChartOutcome::Chart(c) => c,
            ChartOutcome::NoData => panic!("expected a chart"),
        }
    }

    #[test]
    fn chart_names() {
        for name in ["summary", "trend", "breakdown", "group-trend"] {
            assert_eq!(ChartKind::parse(name).unwrap().name(), name);
        }
        assert!(ChartKind::parse("pie").is_err());
    }

    #[test]
    fn summary_uses_the_default_weight() {
        let dash = dashboard();
        let ds = dataset(&dash);
        let c = chart(summary_chart(&dash, &ds, "findjob", 2025).unwrap());
        let good: f64 = c
            .rows
            .iter()
            .filter(|r| r.response == "Good time")
            .map(|r| r.percent)
            .sum();
        // 3 + 2 out of 12
        assert!((good - 5.0 / 12.0).abs() < 1e-9);
        assert_eq!(
            summary_chart(&dash, &ds, "findjob", 2019).unwrap(),
            ChartOutcome::NoData
        );
    }

    #[test]
    fn breakdown_adds_the_nested_group() {
        let dash = dashboard();
        let ds = dataset(&dash);
        let jurisdiction = dash.demographic("Jurisdiction").unwrap();
        let c = chart(breakdown_chart(&dash, &ds, "findjob", 2025, jurisdiction).unwrap());
        assert_eq!(
            c.group_order,
            vec!["City of Atlanta", "Cobb County", "Fulton County"]
        );
        let share = |group: &str, response: &str| -> f64 {
            c.rows
                .iter()
                .filter(|r| r.group.as_deref() == Some(group) && r.response == response)
                .map(|r| r.percent)
                .sum()
        };
        // Atlanta: atlwt of the members only.
        assert_eq!(share("Atlanta", "Good time"), 0.25);
        assert_eq!(share("Atlanta", "Bad time"), 0.75);
        // Fulton keeps its members, weighted with countywt.
        assert_eq!(share("Fulton", "Good time"), 0.25);
        assert_eq!(share("Fulton", "Bad time"), 0.75);
        assert_eq!(share("Cobb", "Good time"), 0.75);
    }

    #[test]
    fn breakdown_without_nested_group() {
        let dash = dashboard();
        let ds = dataset(&dash);
        let race = dash.demographic("Race").unwrap();
        // No record has a race: nothing to show.
        assert_eq!(
            breakdown_chart(&dash, &ds, "findjob", 2025, race).unwrap(),
            ChartOutcome::NoData
        );
    }

    #[test]
    fn group_trend_of_the_nested_group() {
        let dash = dashboard();
        let ds = dataset(&dash);
        let q = dash.question("findjob").unwrap();
        let jurisdiction = dash.demographic("Jurisdiction").unwrap();
        let c = chart(
            group_trend_chart(&dash, &ds, q, jurisdiction, "City of Atlanta").unwrap(),
        );
        let weights: Vec<(Option<u32>, &str, f64)> = c
            .rows
            .iter()
            .map(|r| (r.survey_year, r.response.as_str(), r.weight))
            .collect();
        assert!(weights.contains(&(Some(2024), "Good time", 1.0)));
        assert!(weights.contains(&(Some(2025), "Bad time", 3.0)));
        assert_eq!(weights.len(), 3);
    }

    #[test]
    fn trend_needs_the_flag() {
        let dash = dashboard();
        let ds = dataset(&dash);
        let bigprob = dash.question("bigprob").unwrap();
        assert!(matches!(
            trend_chart(&dash, &ds, bigprob),
            Err(MasError::TrendUnavailable { .. })
        ));
    }

    #[test]
    fn default_charts() {
        let dash = dashboard();
        let findjob = dash.question("findjob").unwrap();
        let bigprob = dash.question("bigprob").unwrap();
        assert_eq!(
            chart_kinds(&[], findjob).unwrap(),
            vec![ChartKind::Summary, ChartKind::Trend]
        );
        assert_eq!(chart_kinds(&[], bigprob).unwrap(), vec![ChartKind::Summary]);
    }

    #[test]
    fn topline_summary() {
        test_wrapper(
            "topline_summary",
            &["--question", "findjob", "--year", "2025"],
        );
    }

    #[test]
    fn jurisdiction_breakdown() {
        test_wrapper(
            "jurisdiction_breakdown",
            &[
                "--question",
                "findjob",
                "--year",
                "2025",
                "--demographic",
                "Jurisdiction",
                "--chart",
                "breakdown",
            ],
        );
    }

    #[test]
    fn group_trend_and_missing_year() {
        test_wrapper(
            "group_trend_and_missing_year",
            &[
                "--question",
                "findjob",
                "--year",
                "2023",
                "--demographic",
                "Jurisdiction",
                "--group",
                "City of Atlanta",
                "--chart",
                "group-trend",
                "--chart",
                "summary",
            ],
        );
    }

    #[test]
    fn topline_summary_from_a_workbook() {
        let res = run_fixture(
            "topline_summary",
            "data.xlsx",
            "expected.json",
            &["--question", "findjob", "--year", "2025"],
        );
        assert!(res.is_ok(), "{:?}", res);
    }

    #[test]
    fn stale_reference() {
        let res = run_fixture(
            "topline_summary",
            "data.csv",
            "stale.json",
            &["--question", "findjob", "--year", "2025"],
        );
        assert!(matches!(res, Err(MasError::ReferenceMismatch { .. })));
    }

    #[test]
    fn unordered_response() {
        test_wrapper("unordered_response", &["--question", "move", "--year", "2025"]);
    }

    #[test]
    fn strict_rejects_unordered_response() {
        let res = run_fixture(
            "unordered_response",
            "data.csv",
            "expected.json",
            &["--question", "move", "--year", "2025", "--strict"],
        );
        assert!(matches!(
            res,
            Err(MasError::StrictDiagnostics { count: 1, .. })
        ));
    }

    #[test]
    fn atlanta_in_county() {
        // The check only warns: the summary is still produced.
        test_wrapper(
            "atlanta_in_county",
            &[
                "--check-dataset",
                "--question",
                "findjob",
                "--year",
                "2025",
                "--chart",
                "summary",
            ],
        );
    }

    #[test]
    fn strict_dataset_check() {
        let res = run_fixture(
            "atlanta_in_county",
            "data.csv",
            "expected.json",
            &[
                "--check-dataset",
                "--strict",
                "--question",
                "findjob",
                "--year",
                "2025",
                "--chart",
                "summary",
            ],
        );
        assert!(matches!(res, Err(MasError::StrictDataset { count: 1, .. })));
    }

    #[test]
    fn built_in_configuration_is_strict_clean() {
        use clap::Parser;
        let args = Args::parse_from(["masdash", "--list-questions", "--strict"]);
        assert!(run(&args).is_ok());
    }

    #[test]
    fn question_list() {
        let dash = dashboard();
        let lines = question_lines(&dash, None);
        assert_eq!(lines.len(), dash.questions.len());
        let bigprob = lines.iter().find(|l| l.starts_with("bigprob\t")).unwrap();
        assert!(bigprob.contains("(No Trend)"));
        assert!(bigprob.ends_with("2017, 2016]"));

        let ds = dataset(&dash);
        let lines = question_lines(&dash, Some(&ds));
        let findjob = lines.iter().find(|l| l.starts_with("findjob\t")).unwrap();
        assert!(findjob.contains("(Trend Available)"));
        assert!(findjob.ends_with("\t[2025, 2024]"));
    }
}
