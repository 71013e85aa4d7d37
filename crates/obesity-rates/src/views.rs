//! Chart-shaped views over [`aggregate`] results.
//!
//! These are caller-level operations the dashboard runs on top of the rate table: ranking and
//! truncating for the bar chart, per-country rates for the map, year/group series for the line
//! chart and two-variable points for the factor scatter.

use crate::aggregate::{aggregate, RateTable};
use crate::error::{RateError, RateResult};
use crate::filter::NormalizedFilter;
use obesity_model::{columns, Dataset, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A count column the dashboard can chart as a population-weighted rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variable {
    Obese,
    Smoke,
    PrimaryEducation,
    Unemployed,
}

impl Variable {
    pub const ALL: [Variable; 4] = [
        Variable::Obese,
        Variable::Smoke,
        Variable::PrimaryEducation,
        Variable::Unemployed,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Variable::Obese => columns::OBESE,
            Variable::Smoke => columns::SMOKE,
            Variable::PrimaryEducation => columns::PRIMEDU,
            Variable::Unemployed => columns::UNEMPLOYED,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variable::Obese => "Obesity Rate",
            Variable::Smoke => "Smoking Rate",
            Variable::PrimaryEducation => "Primary Education Rate",
            Variable::Unemployed => "Unemployment Rate",
        }
    }
}

impl FromStr for Variable {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "obese" | "obesity" => Ok(Variable::Obese),
            "smoke" | "smoking" => Ok(Variable::Smoke),
            "primedu" | "education" => Ok(Variable::PrimaryEducation),
            "unemployed" | "unemployment" => Ok(Variable::Unemployed),
            _ => Err(RateError::selection("variable", format!("unknown variable {s:?}"))),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A categorical column used to split series and color points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Grouping {
    Region,
    Income,
    Sex,
    Country,
}

impl Grouping {
    pub fn column(self) -> &'static str {
        match self {
            Grouping::Region => columns::REGION,
            Grouping::Income => columns::INCOME,
            Grouping::Sex => columns::SEX,
            Grouping::Country => columns::COUNTRY,
        }
    }
}

impl FromStr for Grouping {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(Grouping::Region),
            "income" => Ok(Grouping::Income),
            "sex" => Ok(Grouping::Sex),
            "country" => Ok(Grouping::Country),
            _ => Err(RateError::selection("grouping", format!("unknown grouping {s:?}"))),
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedRate {
    pub country: Value,
    pub rate: f64,
}

/// Countries ordered by descending rate (ties broken by name), truncated to `n`.
///
/// Countries whose rate is missing are left out.
pub fn top_rates(
    dataset: &Dataset,
    variable: Variable,
    filter: &NormalizedFilter,
    n: usize,
) -> RateResult<Vec<RankedRate>> {
    let table = aggregate(dataset, &[columns::COUNTRY], &[variable.column()], filter)?;
    let mut ranked: Vec<RankedRate> = table
        .rows
        .into_iter()
        .filter_map(|row| {
            let rate = row.rate(0)?;
            let country = row.key.into_iter().next()?;
            Some(RankedRate { country, rate })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.rate
            .total_cmp(&a.rate)
            .then_with(|| a.country.cmp(&b.country))
    });
    ranked.truncate(n);
    Ok(ranked)
}

/// Per-country rate table, the input of the choropleth map.
pub fn map_rates(
    dataset: &Dataset,
    variable: Variable,
    filter: &NormalizedFilter,
) -> RateResult<RateTable> {
    aggregate(dataset, &[columns::COUNTRY], &[variable.column()], filter)
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPoint {
    pub year: i64,
    pub group: Value,
    pub rate: Option<f64>,
    pub highlighted: bool,
}

/// Yearly rates per group, plus one series for each highlighted country.
///
/// When grouping by country the highlighted countries are already part of the series and are
/// only flagged. Otherwise each highlighted country contributes an extra series (its group value
/// is the country name) computed under the same filter. Unhighlighted points come first; each
/// part is ordered by group, then year.
pub fn time_series(
    dataset: &Dataset,
    variable: Variable,
    grouping: Grouping,
    filter: &NormalizedFilter,
    highlight: &[String],
) -> RateResult<Vec<SeriesPoint>> {
    let highlighted: HashSet<&str> = highlight.iter().map(String::as_str).collect();

    let table = aggregate(
        dataset,
        &[columns::YEAR, grouping.column()],
        &[variable.column()],
        filter,
    )?;
    let mut points = series_points(&table, |group| {
        grouping == Grouping::Country && group.as_str().is_some_and(|c| highlighted.contains(c))
    });

    if grouping != Grouping::Country && !highlight.is_empty() {
        let country_filter = filter
            .clone()
            .with_column_in(columns::COUNTRY, highlight.iter().map(String::as_str));
        let table = aggregate(
            dataset,
            &[columns::YEAR, columns::COUNTRY],
            &[variable.column()],
            &country_filter,
        )?;
        points.extend(series_points(&table, |_| true));
    }

    points.sort_by(|a, b| {
        a.highlighted
            .cmp(&b.highlighted)
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.year.cmp(&b.year))
    });
    Ok(points)
}

fn series_points(table: &RateTable, is_highlighted: impl Fn(&Value) -> bool) -> Vec<SeriesPoint> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let [year, group] = row.key.as_slice() else {
                return None;
            };
            let Some(year) = year.as_i64() else {
                log::debug!("skipping series row without an integral year: {year}");
                return None;
            };
            Some(SeriesPoint {
                year,
                group: group.clone(),
                rate: row.rate(0),
                highlighted: is_highlighted(group),
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScatterPoint {
    pub country: Value,
    /// Value of the color grouping column (the country itself when coloring by country).
    pub group: Value,
    /// Rate of the secondary variable.
    pub x: f64,
    /// Rate of the primary variable.
    pub y: f64,
}

/// Per-country pairs of rates for the factor scatter.
///
/// Countries are split by the color grouping (e.g. region), and points where either rate is
/// missing are dropped. Points are ordered by group, then country.
pub fn factor_scatter(
    dataset: &Dataset,
    primary: Variable,
    secondary: Variable,
    color: Grouping,
    filter: &NormalizedFilter,
) -> RateResult<Vec<ScatterPoint>> {
    let group_by = if color == Grouping::Country {
        vec![columns::COUNTRY]
    } else {
        vec![color.column(), columns::COUNTRY]
    };
    let table = aggregate(
        dataset,
        &group_by,
        &[primary.column(), secondary.column()],
        filter,
    )?;

    let country_idx = table.group_columns.len() - 1;
    let points = table
        .rows
        .iter()
        .filter_map(|row| {
            let y = row.rate(0)?;
            let x = row.rate(1)?;
            Some(ScatterPoint {
                country: row.key[country_idx].clone(),
                group: row.key[0].clone(),
                x,
                y,
            })
        })
        .collect();
    Ok(points)
}
