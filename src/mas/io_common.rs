use std::collections::HashMap;
use std::path::Path;

use crate::mas::config_reader::ColumnsConfig;
use crate::mas::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The position of the columns of a survey table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnLayout {
    pub question: usize,
    pub response: usize,
    pub survey_year: usize,
    pub weights: Vec<(usize, String)>,
    /// All the other named columns.
    pub attributes: Vec<(usize, String)>,
}

pub fn get_col_index_mapping(
    req_col_names: &[String],
    header: &[Option<String>],
    path: &str,
) -> BMasResult<Vec<(usize, String)>> {
    let col_names: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, x)| x.as_ref().map(|s| (s.clone(), idx)))
        .collect();

    let mut col_indexes: Vec<(usize, String)> = Vec::new();
    for cname in req_col_names {
        let idx = col_names.get(cname).context(MissingColumnSnafu {
            column: cname.clone(),
            path,
        })?;
        col_indexes.push((*idx, cname.clone()));
    }
    Ok(col_indexes)
}

pub fn column_layout(
    header: &[Option<String>],
    columns: &ColumnsConfig,
    path: &str,
) -> BMasResult<ColumnLayout> {
    let required = vec![
        columns.question.clone(),
        columns.response.clone(),
        columns.survey_year.clone(),
    ];
    let idxs: Vec<usize> = get_col_index_mapping(&required, header, path)?
        .into_iter()
        .map(|(idx, _)| idx)
        .collect();

    let mut weights: Vec<(usize, String)> = Vec::new();
    for w in columns.weights.iter() {
        match get_col_index_mapping(&[w.clone()], header, path) {
            Ok(mut found) => weights.append(&mut found),
            Err(_) => warn!(
                "column_layout: no weight column {:?} in {}",
                w,
                simplify_file_name(path)
            ),
        }
    }

    let attributes: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, x)| match x {
            Some(name) if !name.is_empty() => Some((idx, name.clone())),
            _ => None,
        })
        .filter(|(idx, _)| !idxs.contains(idx) && !weights.iter().any(|(w, _)| w == idx))
        .collect();

    let layout = ColumnLayout {
        question: idxs[0],
        response: idxs[1],
        survey_year: idxs[2],
        weights,
        attributes,
    };
    debug!("column_layout: {:?}", layout);
    Ok(layout)
}

/// Reads a survey year written either as an integer or as an integral float,
/// which is how spreadsheets store numbers.
pub fn parse_survey_year(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < 10000.0)
            .map(|f| f as u32)
    })
}

fn cell_at(cells: &[String], idx: usize) -> &str {
    cells.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Builds a record from the cells of a row. Rows without a question or a
/// response are skipped.
pub fn parse_record(
    layout: &ColumnLayout,
    cells: &[String],
    lineno: usize,
) -> BMasResult<Option<SurveyRecord>> {
    let cell = |idx: usize| cell_at(cells, idx);

    let question = cell(layout.question);
    let response = cell(layout.response);
    if question.is_empty() || response.is_empty() {
        debug!("parse_record: line {}: no question or response", lineno);
        return Ok(None);
    }

    let year_s = cell(layout.survey_year);
    let survey_year = parse_survey_year(year_s).context(InvalidSurveyYearSnafu {
        lineno,
        content: year_s,
    })?;

    let mut record = SurveyRecord::new(question, response, survey_year);
    for (idx, name) in layout.weights.iter() {
        let s = cell(*idx);
        if s.is_empty() {
            continue;
        }
        let w = s.parse::<f64>().ok().context(InvalidWeightSnafu {
            lineno,
            column: name.clone(),
            content: s,
        })?;
        record.weights.insert(name.clone(), w);
    }
    for (idx, name) in layout.attributes.iter() {
        let s = cell(*idx);
        if !s.is_empty() {
            record.attributes.insert(name.clone(), s.to_string());
        }
    }
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnsConfig {
        ColumnsConfig {
            question: "question".to_string(),
            response: "response".to_string(),
            survey_year: "survey year".to_string(),
            weights: vec!["countywt".to_string(), "atlwt".to_string()],
        }
    }

    fn header(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|s| Some(s.to_string())).collect()
    }

    fn cells(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn layout_and_record() {
        let h = header(&["county", "question", "response", "survey year", "countywt"]);
        let layout = column_layout(&h, &columns(), "data.csv").unwrap();
        assert_eq!(layout.weights, vec![(4, "countywt".to_string())]);
        assert_eq!(layout.attributes, vec![(0, "county".to_string())]);

        let record = parse_record(
            &layout,
            &cells(&["Cobb", "findjob", "Good time", "2025.0", "1.5"]),
            2,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            record,
            SurveyRecord::new("findjob", "Good time", 2025)
                .with_weight("countywt", 1.5)
                .with_attribute("county", "Cobb")
        );
    }

    #[test]
    fn blank_cells_are_absent() {
        let h = header(&["question", "response", "survey year", "countywt", "atlwt", "county"]);
        let layout = column_layout(&h, &columns(), "data.csv").unwrap();
        let record = parse_record(&layout, &cells(&["findjob", "Bad time", "2024", "2", "", " "]), 3)
            .unwrap()
            .unwrap();
        assert_eq!(record.weight("atlwt"), None);
        assert_eq!(record.attribute("county"), None);

        let skipped = parse_record(&layout, &cells(&["findjob", "", "2024", "2", "", ""]), 4).unwrap();
        assert_eq!(skipped, None);
    }

    #[test]
    fn missing_required_column() {
        let h = header(&["question", "survey year"]);
        let res = column_layout(&h, &columns(), "data.csv");
        assert!(matches!(
            res.map_err(|e| *e),
            Err(MasError::MissingColumn { .. })
        ));
    }

    #[test]
    fn bad_cells() {
        let h = header(&["question", "response", "survey year", "countywt"]);
        let layout = column_layout(&h, &columns(), "data.csv").unwrap();
        let res = parse_record(&layout, &cells(&["findjob", "Good", "last year", "1"]), 2);
        assert!(matches!(
            res.map_err(|e| *e),
            Err(MasError::InvalidSurveyYear { lineno: 2, .. })
        ));
        let res = parse_record(&layout, &cells(&["findjob", "Good", "2025", "heavy"]), 3);
        assert!(matches!(
            res.map_err(|e| *e),
            Err(MasError::InvalidWeight { lineno: 3, .. })
        ));
    }
}
