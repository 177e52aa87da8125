// Primitives for reading CSV files.

use crate::mas::config_reader::ColumnsConfig;
use crate::mas::io_common::{column_layout, parse_record};
use crate::mas::*;

/// Reads a survey table with a header row.
pub fn read_csv_records(path: &str, columns: &ColumnsConfig) -> BMasResult<Vec<SurveyRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<Option<String>> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1usize })?
        .iter()
        .map(|s| Some(s.trim().to_string()))
        .collect();
    debug!("read_csv_records: header: {:?}", header);
    let layout = column_layout(&header, columns, path)?;

    let mut res: Vec<SurveyRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if let Some(record) = parse_record(&layout, &cells, lineno)? {
            res.push(record);
        }
    }
    Ok(res)
}
