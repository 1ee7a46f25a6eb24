/*!

This is the long-form manual for `likert_trends` and `likertsurvey`.

## Input

Each survey wave (week) is one spreadsheet exported from the questionnaire tool,
one row per submission. Only the rows of respondents who gave their consent are kept.
The following columns are used:

| column                                    | use                                        |
|-------------------------------------------|--------------------------------------------|
| `Anon_ID`                                 | pseudonymous respondent identifier          |
| consent statement                         | the row is kept if it is `Yes`             |
| `What master's programme do you follow?`  | current programme                          |
| `What bachelor's programme did you follow?` | programme used while still in the bachelor |
| one column per question                   | the Likert label chosen by the respondent  |

The supported formats are:
* `xlsx` one Excel file per week
* `csv` one CSV file per week, with a header row
* `xlsx_cohort_sheets` one Excel file with one sheet per cohort and week, named
  `{cohort}_Week{n}` (older exports)

The week number is taken from the configuration, or from the file name:
`AGILE_7_anon.xlsx` is week 7.

## Scales

| name          | ranks                                                                                      |
|---------------|--------------------------------------------------------------------------------------------|
| `agreement6`  | Completely disagree, Mostly disagree, Slightly disagree, Slightly agree, Mostly agree, Completely agree |
| `magnitude7`  | None at all, Very little, Little, A moderate amount, Quite a lot, A lot, A great deal       |
| `difficulty7` | Extremely easy, Very easy, Somewhat easy, Neither easy nor difficult, Somewhat difficult, Very difficult, Extremely difficult |

Labels are matched regardless of case and extra spaces. A label that does not belong to
the scale of the question is treated as no answer, and counted in the logs.

## Cohorts

The cohort of a respondent is the current programme. Respondents who answer
`I am still on my bachelor's` are put in the cohort of their bachelor programme.
Rows without any programme are left out of the cohort views, and counted.

## Views

* trend: per cohort and week, the median with the 25th and 75th percentiles, or the mean
  with a 95% confidence half-width (`1.96 * std / sqrt(n)`). The percentiles use the
  `(n + 1) p` rank definition. Weeks without answers have no value (`null`).
* distribution: per week and cohort, the percentage of each rank of the scale.
* snapshot: per week, a question x cohort matrix of the median or the mean.
* summary: the mean trend of several questions, with their common range.
* time series: the answer of every respondent to a question, week by week.
* response rates: the number of respondents per cohort and week, with totals.

## Configuration

```json
{
  "outputSettings": {
    "analysisName": "Agile course 2024",
    "outputDirectory": "out",
    "distributionWeeks": [5, 7, 9],
    "trendStatistic": "median",
    "snapshotStatistic": "median"
  },
  "weekSources": [
    { "provider": "xlsx", "filePath": "data/output_data/AGILE_5_anon.xlsx" },
    { "provider": "csv", "filePath": "data/output_data/AGILE_6_anon.csv", "week": 6 }
  ],
  "columns": {
    "respondentId": "Anon_ID",
    "consent": "I have read the participant information and consent to my data being collected and used in anonymised form for this study.",
    "consentValue": "Yes"
  }
}
```

When `questions` is not given, the 15 questions of the course questionnaire are used.

## Anonymization

```bash
likertsurvey --anonymize --input AGILE_5.xlsx --input AGILE_6.xlsx \
  --id-map data/id_map.csv --out data/output_data
```

Every e-mail address is replaced by the first 10 characters of its SHA-256 digest.
The mapping is kept in the `--id-map` file and reused for the next weeks.
*/
