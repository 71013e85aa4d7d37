use crate::error::{RateError, RateResult};
use crate::filter::NormalizedFilter;
use obesity_model::{columns, Dataset};
use std::fmt;
use std::str::FromStr;

/// A single year or an inclusive year range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YearSelection {
    Single(i32),
    Range { start: i32, end: i32 },
}

impl YearSelection {
    /// Widest range (in years, inclusive) a selection may enumerate.
    pub const MAX_RANGE_YEARS: i64 = 1_000;

    pub fn range(start: i32, end: i32) -> Self {
        YearSelection::Range { start, end }
    }

    /// Every year covered by the selection.
    ///
    /// A descending range is rejected rather than treated as empty, and so is a range spanning
    /// more than [`Self::MAX_RANGE_YEARS`] years.
    pub fn years(self) -> RateResult<std::ops::RangeInclusive<i32>> {
        match self {
            YearSelection::Single(year) => Ok(year..=year),
            YearSelection::Range { start, end } if start > end => Err(RateError::selection(
                columns::YEAR,
                format!("range start {start} is after end {end}"),
            )),
            YearSelection::Range { start, end }
                if i64::from(end) - i64::from(start) + 1 > Self::MAX_RANGE_YEARS =>
            {
                Err(RateError::selection(
                    columns::YEAR,
                    format!(
                        "range {start}..={end} spans more than {} years",
                        Self::MAX_RANGE_YEARS
                    ),
                ))
            }
            YearSelection::Range { start, end } => Ok(start..=end),
        }
    }
}

/// Slider-style input: one value is a single year, two values are a `[start, end]` range.
impl TryFrom<&[i32]> for YearSelection {
    type Error = RateError;

    fn try_from(value: &[i32]) -> Result<Self, Self::Error> {
        match *value {
            [year] => Ok(YearSelection::Single(year)),
            [start, end] => Ok(YearSelection::Range { start, end }),
            _ => Err(RateError::selection(
                columns::YEAR,
                format!("expected one year or a [start, end] pair, got {} values", value.len()),
            )),
        }
    }
}

impl From<i32> for YearSelection {
    fn from(year: i32) -> Self {
        YearSelection::Single(year)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SexSelection {
    Male,
    Female,
    Both,
}

impl SexSelection {
    pub const MALE: &'static str = "Male";
    pub const FEMALE: &'static str = "Female";
    pub const BOTH: &'static str = "Both";

    /// Sex values admitted by this selection.
    pub fn values(self) -> &'static [&'static str] {
        match self {
            SexSelection::Male => &[Self::MALE],
            SexSelection::Female => &[Self::FEMALE],
            SexSelection::Both => &[Self::MALE, Self::FEMALE],
        }
    }
}

impl FromStr for SexSelection {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::MALE => Ok(SexSelection::Male),
            Self::FEMALE => Ok(SexSelection::Female),
            Self::BOTH => Ok(SexSelection::Both),
            other => Err(RateError::selection(
                columns::SEX,
                format!("unrecognized value {other:?} (expected Male, Female or Both)"),
            )),
        }
    }
}

impl fmt::Display for SexSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SexSelection::Male => Self::MALE,
            SexSelection::Female => Self::FEMALE,
            SexSelection::Both => Self::BOTH,
        })
    }
}

/// The user-facing filter state of one dashboard request.
///
/// `None` leaves a dimension unrestricted. For regions and income groups, `Some(vec![])` matches
/// no rows. Passing the full domain (see [`Selection::all_regions`]) is not the same as leaving
/// the field unset: a region or income list only admits named values, so rows whose region or
/// income is missing are excluded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub year: Option<YearSelection>,
    pub sex: Option<SexSelection>,
    pub regions: Option<Vec<String>>,
    pub incomes: Option<Vec<String>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: impl Into<YearSelection>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_year_range(self, start: i32, end: i32) -> Self {
        self.with_year(YearSelection::range(start, end))
    }

    pub fn with_sex(mut self, sex: SexSelection) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_regions<S: Into<String>>(mut self, regions: impl IntoIterator<Item = S>) -> Self {
        self.regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_incomes<S: Into<String>>(mut self, incomes: impl IntoIterator<Item = S>) -> Self {
        self.incomes = Some(incomes.into_iter().map(Into::into).collect());
        self
    }

    /// Every region name present in the dataset.
    ///
    /// Missing regions have no name and are not part of the domain.
    pub fn all_regions(dataset: &Dataset) -> Vec<String> {
        text_domain(dataset, columns::REGION)
    }

    /// Every income group present in the dataset, without missing values.
    pub fn all_incomes(dataset: &Dataset) -> Vec<String> {
        text_domain(dataset, columns::INCOME)
    }

    /// Convert the selection into a [`NormalizedFilter`].
    ///
    /// Year ranges are enumerated year by year; `Both` expands to `{Male, Female}`; region and
    /// income lists are collapsed into sets.
    pub fn normalize(&self) -> RateResult<NormalizedFilter> {
        let mut filter = NormalizedFilter::empty();

        if let Some(year) = self.year {
            filter.set_column_in(columns::YEAR, year.years()?);
        }
        if let Some(sex) = self.sex {
            filter.set_column_in(columns::SEX, sex.values().iter().copied());
        }
        if let Some(regions) = &self.regions {
            filter.set_column_in(columns::REGION, regions.iter().map(String::as_str));
        }
        if let Some(incomes) = &self.incomes {
            filter.set_column_in(columns::INCOME, incomes.iter().map(String::as_str));
        }

        Ok(filter)
    }
}

fn text_domain(dataset: &Dataset, column: &str) -> Vec<String> {
    dataset
        .distinct_values(column)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use obesity_model::Value;

    #[test]
    fn single_year_normalizes_to_singleton() {
        let filter = Selection::new().with_year(2016).normalize().unwrap();
        let years: Vec<_> = filter.admissible("year").unwrap().iter().cloned().collect();
        assert_eq!(years, vec![Value::from(2016)]);
    }

    #[test]
    fn descending_range_is_invalid() {
        let err = Selection::new()
            .with_year_range(2012, 2010)
            .normalize()
            .unwrap_err();
        assert!(matches!(err, RateError::InvalidSelection { dimension, .. } if dimension == "year"));
    }

    #[test]
    fn oversized_range_is_invalid() {
        let err = Selection::new()
            .with_year_range(0, i32::MAX)
            .normalize()
            .unwrap_err();
        assert!(matches!(err, RateError::InvalidSelection { dimension, .. } if dimension == "year"));

        let err = YearSelection::range(i32::MIN, i32::MAX).years().unwrap_err();
        assert!(matches!(err, RateError::InvalidSelection { .. }));

        let widest = YearSelection::range(1001, 2000).years().unwrap();
        assert_eq!(widest.count(), 1_000);
        assert!(YearSelection::range(1000, 2000).years().is_err());
    }

    #[test]
    fn slider_values_convert_to_year_selection() {
        let single: &[i32] = &[2010];
        let pair: &[i32] = &[2010, 2014];
        let empty: &[i32] = &[];
        let triple: &[i32] = &[1, 2, 3];

        assert_eq!(
            YearSelection::try_from(single).unwrap(),
            YearSelection::Single(2010)
        );
        assert_eq!(
            YearSelection::try_from(pair).unwrap(),
            YearSelection::range(2010, 2014)
        );
        assert!(YearSelection::try_from(empty).is_err());
        assert!(YearSelection::try_from(triple).is_err());
    }

    #[test]
    fn sex_literals_parse_exactly() {
        assert_eq!("Both".parse::<SexSelection>().unwrap(), SexSelection::Both);
        assert_eq!("Male".parse::<SexSelection>().unwrap(), SexSelection::Male);
        assert!("male".parse::<SexSelection>().is_err());
        assert!("Other".parse::<SexSelection>().is_err());
    }

    #[test]
    fn duplicate_regions_collapse() {
        let filter = Selection::new()
            .with_regions(["Europe", "Europe", "Asia"])
            .normalize()
            .unwrap();
        assert_eq!(filter.admissible("region").unwrap().len(), 2);
    }

    #[test]
    fn unset_dimensions_are_absent() {
        let filter = Selection::new().with_sex(SexSelection::Female).normalize().unwrap();
        assert_eq!(filter.columns().count(), 1);
        assert!(filter.admissible("region").is_none());
    }
}
