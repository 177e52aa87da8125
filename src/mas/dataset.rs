// The survey dataset, and the process-wide cache that keeps it in memory.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::mas::config_reader::ColumnsConfig;
use crate::mas::io_common::simplify_file_name;
use crate::mas::io_csv::read_csv_records;
use crate::mas::io_excel::read_excel_records;
use crate::mas::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Csv,
    Xlsx,
}

impl InputType {
    /// The input type named on the command line, or guessed from the file
    /// extension.
    pub fn parse(input_type: Option<&str>, path: &str) -> MasResult<InputType> {
        let name = match input_type {
            Some(t) => t.to_lowercase(),
            None => Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("csv")
                .to_lowercase(),
        };
        match name.as_str() {
            "csv" => Ok(InputType::Csv),
            "xlsx" | "excel" => Ok(InputType::Xlsx),
            _ => UnknownInputTypeSnafu { input_type: name }.fail(),
        }
    }
}

/// Everything that determines the content of a loaded dataset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DatasetSource {
    pub path: String,
    pub input_type: InputType,
    pub worksheet: Option<String>,
    pub columns: ColumnsConfig,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: DatasetSource,
    pub records: Vec<SurveyRecord>,
}

impl Dataset {
    pub fn question_records(&self, question: &str) -> Vec<&SurveyRecord> {
        self.records
            .iter()
            .filter(|r| r.question == question)
            .collect()
    }

    pub fn records_for(&self, question: &str, year: u32) -> Vec<&SurveyRecord> {
        self.records
            .iter()
            .filter(|r| r.question == question && r.survey_year == year)
            .collect()
    }

    /// The survey years with data for a question, most recent first.
    pub fn years_for(&self, question: &str) -> Vec<u32> {
        let years: BTreeSet<u32> = self
            .records
            .iter()
            .filter(|r| r.question == question)
            .map(|r| r.survey_year)
            .collect();
        years.into_iter().rev().collect()
    }
}

pub fn read_dataset(source: &DatasetSource) -> BMasResult<Dataset> {
    info!(
        "read_dataset: reading {} ({:?})",
        simplify_file_name(&source.path),
        source.input_type
    );
    let records = match source.input_type {
        InputType::Csv => read_csv_records(&source.path, &source.columns)?,
        InputType::Xlsx => {
            read_excel_records(&source.path, source.worksheet.as_deref(), &source.columns)?
        }
    };
    info!("read_dataset: {} records", records.len());
    Ok(Dataset {
        source: source.clone(),
        records,
    })
}

/// Keeps the last loaded dataset, so that all the charts rendered by the
/// process share a single read of the file.
pub struct DatasetCache {
    entry: Mutex<Option<Arc<Dataset>>>,
}

static DATASET_CACHE: DatasetCache = DatasetCache::new();

pub fn dataset_cache() -> &'static DatasetCache {
    &DATASET_CACHE
}

impl DatasetCache {
    pub const fn new() -> DatasetCache {
        DatasetCache {
            entry: Mutex::new(None),
        }
    }

    pub fn get_or_load<F>(&self, source: &DatasetSource, load: F) -> BMasResult<Arc<Dataset>>
    where
        F: FnOnce(&DatasetSource) -> BMasResult<Dataset>,
    {
        // A panic while loading leaves no entry behind, so a poisoned lock is usable.
        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ds) = entry.as_ref() {
            if &ds.source == source {
                debug!("get_or_load: cache hit for {:?}", source.path);
                return Ok(ds.clone());
            }
            debug!("get_or_load: replacing {:?}", ds.source.path);
        }
        let ds = Arc::new(load(source)?);
        *entry = Some(ds.clone());
        Ok(ds)
    }

    pub fn clear(&self) {
        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        *entry = None;
    }
}
