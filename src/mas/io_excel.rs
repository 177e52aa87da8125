// Primitives for reading Excel files.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::mas::config_reader::ColumnsConfig;
use crate::mas::io_common::{column_layout, parse_record};
use crate::mas::*;

/// Reads a survey table from a worksheet. The first row is the header.
pub fn read_excel_records(
    path: &str,
    worksheet: Option<&str>,
    columns: &ColumnsConfig,
) -> BMasResult<Vec<SurveyRecord>> {
    let wrange = get_range(path, worksheet)?;
    let mut rows = wrange.rows();

    let header_row = rows.next().context(EmptyInputSnafu { path })?;
    let header: Vec<Option<String>> = header_row
        .iter()
        .enumerate()
        .map(|(col, dt)| match dt {
            DataType::Empty => Ok(None),
            other => cell_text(other, 1, col).map(|s| Some(s.trim().to_string())),
        })
        .collect::<BMasResult<Vec<Option<String>>>>()?;
    debug!("read_excel_records: header: {:?}", header);
    let layout = column_layout(&header, columns, path)?;

    let mut res: Vec<SurveyRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, dt)| cell_text(dt, lineno, col))
            .collect::<BMasResult<Vec<String>>>()?;
        if let Some(record) = parse_record(&layout, &cells, lineno)? {
            res.push(record);
        }
    }
    Ok(res)
}

fn cell_text(dt: &DataType, lineno: usize, col: usize) -> BMasResult<String> {
    match dt {
        DataType::String(s) => Ok(s.clone()),
        DataType::Float(f) | DataType::DateTime(f) => Ok(f.to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok(String::new()),
        DataType::Error(e) => Err(Box::new(MasError::ExcelWrongCellType {
            lineno,
            column: col + 1,
            content: format!("{:?}", e),
        })),
    }
}

fn get_range(path: &str, worksheet: Option<&str>) -> BMasResult<calamine::Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })?;
        return Ok(wrange);
    }

    let all_worksheets = workbook.worksheets();
    match all_worksheets.as_slice() {
        [] => EmptyInputSnafu { path }.fail().map_err(Box::new),
        [(worksheet_name, wrange)] => {
            debug!("get_range: using the only worksheet {:?}", worksheet_name);
            Ok(wrange.clone())
        }
        _ => AmbiguousWorksheetSnafu {
            path,
            names: all_worksheets
                .iter()
                .map(|(name, _)| name.clone())
                .collect::<Vec<String>>(),
        }
        .fail()
        .map_err(Box::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_as_text() {
        assert_eq!(cell_text(&DataType::Float(2025.0), 2, 0).unwrap(), "2025");
        assert_eq!(cell_text(&DataType::Float(0.5), 2, 0).unwrap(), "0.5");
        assert_eq!(cell_text(&DataType::Int(3), 2, 0).unwrap(), "3");
        assert_eq!(cell_text(&DataType::Empty, 2, 0).unwrap(), "");
        assert_eq!(
            cell_text(&DataType::String("Cobb".to_string()), 2, 0).unwrap(),
            "Cobb"
        );
        let res = cell_text(&DataType::Error(calamine::CellErrorType::Div0), 7, 2);
        assert!(matches!(
            res.map_err(|e| *e),
            Err(MasError::ExcelWrongCellType {
                lineno: 7,
                column: 3,
                ..
            })
        ));
    }

    const WORKBOOK: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/data/topline_summary/topline_summary_data.xlsx"
    );

    fn columns() -> ColumnsConfig {
        ColumnsConfig {
            question: "question".to_string(),
            response: "response".to_string(),
            survey_year: "survey year".to_string(),
            weights: vec!["countywt".to_string(), "atlwt".to_string()],
        }
    }

    #[test]
    fn reads_the_workbook() {
        let records = read_excel_records(WORKBOOK, None, &columns()).unwrap();
        assert_eq!(records.len(), 10);
        let first = &records[0];
        assert_eq!(first.question, "findjob");
        assert_eq!(first.response, "Good time to find a job");
        assert_eq!(first.survey_year, 2025);
        assert_eq!(first.weight("countywt"), Some(3.0));
        assert_eq!(first.weight("atlwt"), None);
        assert_eq!(first.attribute("county"), Some("Cobb"));
        let member = &records[5];
        assert_eq!(member.weight("atlwt"), Some(3.0));
        assert_eq!(member.attribute("atlanta resident"), Some("Yes"));
    }

    #[test]
    fn worksheet_by_name() {
        let records = read_excel_records(WORKBOOK, Some("responses"), &columns()).unwrap();
        assert_eq!(records.len(), 10);
        let res = read_excel_records(WORKBOOK, Some("Sheet2"), &columns());
        assert!(matches!(
            res.map_err(|e| *e),
            Err(MasError::MissingWorksheet { .. })
        ));
    }

    #[test]
    fn missing_workbook() {
        let path = std::env::temp_dir().join("masdash_no_such_workbook.xlsx");
        let _ = std::fs::remove_file(&path);
        let res = get_range(path.to_str().unwrap(), None);
        assert!(matches!(
            res.map_err(|e| *e),
            Err(MasError::OpeningExcel { .. })
        ));
    }
}
