use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use obesity_model::{columns, import_csv_path, CsvOptions, Dataset};
use obesity_rates::views::{factor_scatter, map_rates, time_series, top_rates};
use obesity_rates::{aggregate, Grouping, NormalizedFilter, Selection, Variable, YearSelection};
use serde::Serialize;

use crate::report::Report;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(
    name = "obesity-explorer",
    about = "Population-weighted obesity, smoking, education and unemployment rates from the processed country/year dataset."
)]
pub struct Args {
    /// Processed obesity dataset (CSV with country, region, income, sex, year, pop and count columns).
    #[arg(long, value_name = "PATH")]
    data: PathBuf,

    /// Field delimiter of the dataset file.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

/// Row selection shared by every subcommand.
///
/// Unset flags leave their dimension unrestricted.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SelectionArgs {
    /// A single year, or `START END` for an inclusive range. May be given once.
    #[arg(long, num_args = 1..=2, value_name = "YEAR", action = ArgAction::Set)]
    year: Vec<i32>,

    /// Male, Female or Both.
    #[arg(long)]
    sex: Option<String>,

    /// Region to include (repeatable).
    #[arg(long = "region", value_name = "REGION")]
    regions: Vec<String>,

    /// Income group to include (repeatable).
    #[arg(long = "income", value_name = "INCOME")]
    incomes: Vec<String>,
}

impl SelectionArgs {
    fn selection(&self) -> Result<Selection> {
        let mut selection = Selection::new();
        if !self.year.is_empty() {
            selection = selection.with_year(YearSelection::try_from(self.year.as_slice())?);
        }
        if let Some(sex) = &self.sex {
            selection = selection.with_sex(sex.parse()?);
        }
        if !self.regions.is_empty() {
            selection = selection.with_regions(self.regions.iter().cloned());
        }
        if !self.incomes.is_empty() {
            selection = selection.with_incomes(self.incomes.iter().cloned());
        }
        Ok(selection)
    }

    fn filter(&self) -> Result<NormalizedFilter> {
        let filter = self.selection()?.normalize()?;
        log::debug!("selection normalized to: {filter}");
        Ok(filter)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rates of arbitrary count columns grouped by arbitrary columns.
    Rates {
        /// Grouping column (repeatable). Without any, one overall row is reported.
        #[arg(long = "group-by", value_name = "COLUMN")]
        group_by: Vec<String>,

        /// Count column to compute a rate for (repeatable).
        #[arg(long = "value", value_name = "COLUMN", required = true)]
        values: Vec<String>,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Countries with the highest rate (bar chart).
    Top {
        #[arg(long, default_value = "obese")]
        variable: Variable,

        /// Number of countries to keep.
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Rate per country (choropleth map).
    Map {
        #[arg(long, default_value = "obese")]
        variable: Variable,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Yearly rates per group, plus highlighted countries (time series).
    Series {
        #[arg(long, default_value = "obese")]
        variable: Variable,

        /// Column that splits the series: region, income, sex or country.
        #[arg(long = "group-by", default_value = "region")]
        grouping: Grouping,

        /// Country to draw as its own highlighted series (repeatable).
        #[arg(long = "highlight", value_name = "COUNTRY")]
        highlight: Vec<String>,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Primary against secondary rate per country (factor scatter).
    Scatter {
        #[arg(long, default_value = "obese")]
        primary: Variable,

        #[arg(long, default_value = "smoke")]
        secondary: Variable,

        /// Column used to color the points.
        #[arg(long, default_value = "region")]
        color: Grouping,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Values available for each selection dimension.
    Domains,
}

#[derive(Debug, Serialize)]
struct JsonDomains {
    rows: usize,
    years: Vec<i64>,
    sexes: Vec<String>,
    regions: Vec<String>,
    incomes: Vec<String>,
    countries: Vec<String>,
    variables: Vec<&'static str>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match run_with_args(args, &mut handle) {
        // A downstream consumer closing the pipe (e.g. `| head`) is not a failure.
        Err(err) if is_broken_pipe(&err) => Ok(()),
        other => other,
    }
}

pub fn run_with_args(args: Args, out: &mut dyn Write) -> Result<()> {
    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter {:?} is not a single ASCII character", args.delimiter))?;
    let options = CsvOptions {
        delimiter,
        ..CsvOptions::default()
    };
    let dataset = import_csv_path(&args.data, options)
        .with_context(|| format!("load dataset {}", args.data.display()))?;
    log::info!(
        "loaded {} rows from {}",
        dataset.row_count(),
        args.data.display()
    );

    let report = match &args.command {
        Command::Rates {
            group_by,
            values,
            selection,
        } => {
            let group_by: Vec<&str> = group_by.iter().map(String::as_str).collect();
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            let table = aggregate(&dataset, &group_by, &values, &selection.filter()?)?;
            Report::from(&table)
        }
        Command::Top {
            variable,
            limit,
            selection,
        } => {
            let ranked = top_rates(&dataset, *variable, &selection.filter()?, *limit)?;
            Report::ranked(&ranked, variable.column())
        }
        Command::Map {
            variable,
            selection,
        } => Report::from(&map_rates(&dataset, *variable, &selection.filter()?)?),
        Command::Series {
            variable,
            grouping,
            highlight,
            selection,
        } => {
            let points = time_series(
                &dataset,
                *variable,
                *grouping,
                &selection.filter()?,
                highlight,
            )?;
            Report::series(&points, grouping.column(), variable.column())
        }
        Command::Scatter {
            primary,
            secondary,
            color,
            selection,
        } => {
            let points = factor_scatter(
                &dataset,
                *primary,
                *secondary,
                *color,
                &selection.filter()?,
            )?;
            Report::scatter(&points, color.column(), secondary.column(), primary.column())
        }
        Command::Domains => return write_domains(&dataset, args.format, out),
    };

    match args.format {
        OutputFormat::Text => report.write_text(out),
        OutputFormat::Json => report.write_json(out),
        OutputFormat::Csv => report.write_csv(out),
    }
}

fn write_domains(dataset: &Dataset, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let text = |column: &str| -> Vec<String> {
        dataset
            .distinct_values(column)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    };
    let domains = JsonDomains {
        rows: dataset.row_count(),
        years: dataset
            .distinct_values(columns::YEAR)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_i64())
            .collect(),
        sexes: text(columns::SEX),
        regions: Selection::all_regions(dataset),
        incomes: Selection::all_incomes(dataset),
        countries: text(columns::COUNTRY),
        variables: Variable::ALL
            .iter()
            .map(|v| v.column())
            .filter(|c| dataset.column_idx(c).is_some())
            .collect(),
    };

    match format {
        OutputFormat::Json => {
            let mut buf = serde_json::to_vec(&domains)?;
            buf.push(b'\n');
            out.write_all(&buf)?;
        }
        OutputFormat::Text | OutputFormat::Csv => {
            let years = match (domains.years.first(), domains.years.last()) {
                (Some(first), Some(last)) => format!("{first}-{last}"),
                _ => "(none)".to_string(),
            };
            writeln!(out, "rows: {}", domains.rows)?;
            writeln!(out, "years: {years}")?;
            writeln!(out, "sexes: {}", domains.sexes.join(", "))?;
            writeln!(out, "regions: {}", domains.regions.join(", "))?;
            writeln!(out, "incomes: {}", domains.incomes.join(", "))?;
            writeln!(out, "countries: {}", domains.countries.len())?;
            writeln!(out, "variables: {}", domains.variables.join(", "))?;
        }
    }
    Ok(())
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use obesity_rates::RateError;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/obesity-sample.csv")
    }

    fn run_cli(argv: &[&str]) -> Result<String> {
        let fixture = fixture();
        let mut full = vec!["obesity-explorer", "--data", fixture.to_str().unwrap()];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full)?;
        let mut out = Vec::new();
        run_with_args(args, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn rates_csv_reports_missing_smoking_as_empty() {
        let out = run_cli(&[
            "--format", "csv", "rates", "--group-by", "country", "--value", "obese", "--value",
            "smoke", "--year", "2015", "--sex", "Both",
        ])
        .unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "country,obese,smoke");
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().any(|l| l.starts_with("Mexico,") && l.ends_with(',')));
    }

    #[test]
    fn top_json_ranks_countries() {
        let out = run_cli(&["top", "--year", "2016", "-n", "2", "--format", "json"]).unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        let countries: Vec<&str> = records
            .iter()
            .map(|r| r["country"].as_str().unwrap())
            .collect();
        assert_eq!(countries, vec!["Canada", "Mexico"]);
        assert_eq!(records[0]["rank"], 1);
    }

    #[test]
    fn series_includes_highlighted_country() {
        let out = run_cli(&[
            "--format",
            "json",
            "series",
            "--group-by",
            "income",
            "--highlight",
            "Chad",
            "--variable",
            "smoke",
        ])
        .unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        let chad: Vec<&serde_json::Value> = records
            .iter()
            .filter(|r| r["highlighted"] == true)
            .collect();
        assert_eq!(chad.len(), 1);
        assert_eq!(chad[0]["income"], "Chad");
        assert_eq!(chad[0]["year"], 2016);
    }

    #[test]
    fn scatter_drops_countries_without_both_rates() {
        let out = run_cli(&["--format", "csv", "scatter", "--year", "2016"]).unwrap();
        assert_eq!(out.lines().next(), Some("country,region,smoke,obese"));
        assert!(!out.contains("Chad"));
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn year_range_flags_take_two_values() {
        let out = run_cli(&[
            "--format", "json", "rates", "--group-by", "year", "--value", "obese", "--year",
            "2015", "2016",
        ])
        .unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        let years: Vec<i64> = records.iter().map(|r| r["year"].as_i64().unwrap()).collect();
        assert_eq!(years, vec![2015, 2016]);
    }

    #[test]
    fn invalid_sex_is_a_selection_error() {
        let err = run_cli(&["map", "--sex", "Everyone"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn descending_year_range_is_rejected() {
        let err = run_cli(&["map", "--year", "2016", "2015"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn repeated_year_flag_is_rejected() {
        let fixture = fixture();
        let err = Args::try_parse_from([
            "obesity-explorer",
            "--data",
            fixture.to_str().unwrap(),
            "map",
            "--year",
            "2010",
            "--year",
            "2012",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn huge_year_range_is_rejected_before_enumerating() {
        let err = run_cli(&["map", "--year", "0", "2147483647"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::InvalidSelection { dimension, .. }) if dimension == "year"
        ));
    }

    #[test]
    fn unknown_value_column_is_reported() {
        let err = run_cli(&["rates", "--value", "bmi"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RateError>(),
            Some(RateError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn domains_lists_selection_values() {
        let out = run_cli(&["--format", "json", "domains"]).unwrap();
        let domains: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(domains["rows"], 14);
        assert_eq!(domains["years"], serde_json::json!([2015, 2016]));
        assert_eq!(domains["sexes"], serde_json::json!(["Female", "Male"]));
        assert_eq!(
            domains["variables"],
            serde_json::json!(["obese", "smoke", "primedu", "unemployed"])
        );
    }

    #[test]
    fn missing_dataset_mentions_path() {
        let args = Args::try_parse_from([
            "obesity-explorer",
            "--data",
            "/nonexistent/obesity.csv",
            "domains",
        ])
        .unwrap();
        let err = run_with_args(args, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/obesity.csv"));
    }
}
