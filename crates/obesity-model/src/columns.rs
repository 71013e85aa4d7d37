//! Column names of the processed obesity dataset.

pub const COUNTRY: &str = "country";
pub const REGION: &str = "region";
pub const INCOME: &str = "income";
pub const SEX: &str = "sex";
pub const YEAR: &str = "year";

/// Population count; the denominator of every rate.
pub const POP: &str = "pop";

pub const OBESE: &str = "obese";
pub const SMOKE: &str = "smoke";
pub const PRIMEDU: &str = "primedu";
pub const UNEMPLOYED: &str = "unemployed";

/// Numeric count columns a rate can be computed for.
pub const VALUE_COLUMNS: [&str; 4] = [OBESE, SMOKE, PRIMEDU, UNEMPLOYED];

/// Columns the CSV importer always reads as text, even if every sample parses as a number.
pub const TEXT_COLUMNS: [&str; 4] = [COUNTRY, REGION, INCOME, SEX];
