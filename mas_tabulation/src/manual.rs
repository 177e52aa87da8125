/*!

This is the long-form manual for `mas_tabulation` and `masdash`.

## Input formats

The survey dataset is a table with one row per respondent and question. The
following formats are supported:
* `csv` Comma Separated Values, with a header row
* `xlsx` Excel spreadsheet. The first row of the worksheet is the header.

The names of the required columns are set in the configuration:
* the question code (`question` by default)
* the response (`response` by default)
* the survey year (`survey year` by default), which must be an integer
* the weight columns (`countywt` and `atlwt` by default). Blank cells mean
  that the respondent has no weight in this column.

All the other columns are kept as demographic attributes (`county`,
`income`, `atlanta resident`, ...). Blank cells are treated as missing
values, and a respondent with a missing value is left out of the breakdowns
by that attribute.

## Configuration

The configuration is a JSON document. A complete configuration for the
Metro Atlanta Speaks questionnaire is embedded in `masdash` and used when
no `--config` option is passed.

```json
{
  "columns": {
    "question": "question",
    "response": "response",
    "survey_year": "survey year",
    "weights": ["countywt", "atlwt"]
  },
  "default_weight": "countywt",
  "trend_rule_year": "2025",
  "nested_geography": {
    "demographic": "Jurisdiction",
    "label": "Atlanta",
    "member_column": "atlanta resident",
    "member_value": "Yes",
    "weight_column": "atlwt"
  },
  "questions": [
    {"code": "findjob", "text": "ECONOMY| Is now a good time to find a job?", "trend": true}
  ],
  "demographics": [
    {"name": "Jurisdiction", "column": "county",
     "group_rename": {"Atlanta": "City of Atlanta"}},
    {"name": "Income", "column": "income",
     "excluded_groups": ["DK"],
     "group_order": ["Less than $30K", "$30K-$60K", "More than $60K"]}
  ],
  "charts": {
    "findjob": {
      "2025": {
        "exclude_responses": ["DK"],
        "response_aliases": {"Good time to find a job": "Good time"},
        "custom_order": ["Good time", "Bad time"],
        "custom_colors": {"Good time": "#3A80C1", "Bad time": "#FF9F58"},
        "residual": "keep"
      }
    }
  }
}
```

### Chart rules

The rules of a chart are looked up by question code and four-digit survey
year. A question or a year without rules is drawn with the defaults: no
exclusion, no alias, responses ordered by decreasing share, and colors from
the `category20` scheme.

The rules are applied in this order:
1. `exclude_responses` removes responses from the chart. With
   `"residual": "keep"` (the default), the share of the excluded responses
   stays in the denominator, so the bars of a chart sum to less than 100%.
   With `"residual": "renormalize"`, the remaining responses are rescaled to
   sum to 100%.
2. `response_aliases` maps raw responses to the labels shown in the chart.
3. `custom_order` lists the responses in legend and stacking order. Entries
   may be written with the raw response or with its alias. Responses that
   are not listed are placed at the end, in alphabetical order, and reported.
4. `custom_colors` maps responses (raw or aliased) to colors. Responses
   without a configured color receive a color from the `category20` scheme
   that is not already used by the configuration.

The configuration is checked when it is loaded: two responses sharing the
same alias, order entries listed twice, and order entries that match two
different responses are reported. With `--strict`, they are errors.

### Trend charts

Trend charts show a question across all the survey years. They are only
available for questions flagged with `"trend": true`, and they are always
drawn with the rules of `trend_rule_year`, so that every year of the chart
shares the same legend.

### Demographic breakdowns

A breakdown splits the responses by one of the `demographics`. Each entry
names the dataset `column` and may exclude groups, rename them, and fix
their order on the axis. Groups missing from `group_order` are placed after
the listed ones, in alphabetical order.

The `nested_geography` is an area whose respondents are also counted in a
larger area. For Metro Atlanta Speaks, City of Atlanta residents are part of
the Fulton and DeKalb samples, and they also have their own weight `atlwt`.
When the `Jurisdiction` breakdown is drawn, an additional `Atlanta` group is
computed from the respondents with `atlanta resident` set to `Yes`, weighted
with `atlwt`. Each group is normalized on its own, so that the Atlanta bar
and the county bars all describe a complete population.

## Command line

```text
masdash --input data.csv --question findjob --year 2025 --chart summary
masdash --input data.xlsx --question findjob --chart trend --out findjob.json
masdash --input data.csv --question findjob --demographic Jurisdiction --chart breakdown
masdash --input data.csv --question findjob --demographic Jurisdiction --group Atlanta --chart group-trend
masdash --list-questions
```

The output is a JSON document with one entry per requested chart. A chart
either has the status `ok`, with its rows, legend order and group order, or
the status `noData` if no respondent matched the selection.

The `--session` option points to a JSON file that remembers the selected
question, year and demographic from one run to the next. Options given on the
command line always take precedence over the session.

The `--reference` option compares the output with a JSON file and fails if
they differ. This is how the test suite checks the program.
*/
