#![allow(dead_code)]

use obesity_model::{ColumnSchema, Dataset, Value};

pub fn schema() -> Vec<ColumnSchema> {
    vec![
        ColumnSchema::text("country"),
        ColumnSchema::text("region"),
        ColumnSchema::text("income"),
        ColumnSchema::text("sex"),
        ColumnSchema::number("year"),
        ColumnSchema::number("pop"),
        ColumnSchema::number("obese"),
        ColumnSchema::number("smoke"),
        ColumnSchema::number("primedu"),
        ColumnSchema::number("unemployed"),
    ]
}

/// One observation (country × sex × year) of the obesity dataset.
#[derive(Clone, Copy, Debug)]
pub struct Obs {
    pub country: &'static str,
    pub region: Option<&'static str>,
    pub income: Option<&'static str>,
    pub sex: &'static str,
    pub year: i32,
    pub pop: Option<f64>,
    pub obese: Option<f64>,
    pub smoke: Option<f64>,
}

impl Obs {
    pub fn new(country: &'static str, sex: &'static str, year: i32, pop: f64) -> Self {
        Self {
            country,
            region: Some("Europe"),
            income: Some("High income"),
            sex,
            year,
            pop: Some(pop),
            obese: None,
            smoke: None,
        }
    }

    pub fn obese(mut self, value: f64) -> Self {
        self.obese = Some(value);
        self
    }

    pub fn smoke(mut self, value: f64) -> Self {
        self.smoke = Some(value);
        self
    }

    pub fn region(mut self, region: Option<&'static str>) -> Self {
        self.region = region;
        self
    }

    pub fn income(mut self, income: &'static str) -> Self {
        self.income = Some(income);
        self
    }

    pub fn no_pop(mut self) -> Self {
        self.pop = None;
        self
    }

    pub fn to_row(self) -> Vec<Value> {
        vec![
            self.country.into(),
            self.region.into(),
            self.income.into(),
            self.sex.into(),
            self.year.into(),
            self.pop.into(),
            self.obese.into(),
            self.smoke.into(),
            Value::Null,
            Value::Null,
        ]
    }
}

pub fn dataset(observations: &[Obs]) -> Dataset {
    let mut ds = Dataset::new(schema()).unwrap();
    for obs in observations {
        ds.push_row(obs.to_row()).unwrap();
    }
    ds
}

pub fn key(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}
