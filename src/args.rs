use clap::Parser;

/// This is the tabulation program behind the Metro Atlanta Speaks survey dashboard.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file with the dataset columns, the question catalog, the demographics
    /// and the rules of every chart. If not provided, the built-in Metro Atlanta Speaks configuration is used.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The survey dataset, with one row per respondent and question.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx, default from the file extension) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use. It can be omitted if the workbook
    /// has a single worksheet.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (question code or full text) The question to chart. Defaults to the question of the session, or to
    /// the first question of the catalog.
    #[clap(short, long, value_parser)]
    pub question: Option<String>,

    /// The survey year. Defaults to the year of the session if the question has data for it, or to the
    /// most recent year.
    #[clap(short, long, value_parser)]
    pub year: Option<u32>,

    /// The demographic of the breakdown charts (for example Jurisdiction or Income).
    #[clap(short, long, value_parser)]
    pub demographic: Option<String>,

    /// The demographic group of the group-trend chart (for example "City of Atlanta").
    #[clap(short, long, value_parser)]
    pub group: Option<String>,

    /// (summary, trend, breakdown or group-trend, repeatable) The charts to compute. By default, the summary
    /// of the question and its trend when one is available.
    #[clap(long, value_parser)]
    pub chart: Vec<String>,

    /// (file path, 'stdout' or empty) Where the charts are written in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file with the expected charts in JSON format. If provided, masdash will
    /// check that the output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) A JSON file that keeps the selected question, year and demographic between runs.
    #[clap(long, value_parser)]
    pub session: Option<String>,

    /// Lists the questions of the catalog and exits.
    #[clap(long, takes_value = false)]
    pub list_questions: bool,

    /// Checks the dataset for the assumptions of the nested geography.
    #[clap(long, takes_value = false)]
    pub check_dataset: bool,

    /// Fails on configuration issues, dataset issues and chart diagnostics instead of reporting them.
    #[clap(long, takes_value = false)]
    pub strict: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
