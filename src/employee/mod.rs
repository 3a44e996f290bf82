pub mod validation;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use validation::{
    check_features, validate, validate_field, DecodedForm, Field, FieldError, FieldValue, Reason,
    Rule, ValidationErrors,
};

/// Closed set of string values the backend accepts for a categorical column.
pub trait Categorical: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL.iter().copied().find(|v| v.as_str() == trimmed)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{value:?} is not a valid {kind}")]
pub struct CategoryParseError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Department {
    Sales,
    Engineering,
    #[serde(rename = "HR")]
    Hr,
    Marketing,
    Finance,
}

impl Categorical for Department {
    const ALL: &'static [Self] = &[
        Self::Sales,
        Self::Engineering,
        Self::Hr,
        Self::Marketing,
        Self::Finance,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Engineering => "Engineering",
            Self::Hr => "HR",
            Self::Marketing => "Marketing",
            Self::Finance => "Finance",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Level {
    Junior,
    Pleno,
    Senior,
}

impl Categorical for Level {
    const ALL: &'static [Self] = &[Self::Junior, Self::Pleno, Self::Senior];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Junior => "Junior",
            Self::Pleno => "Pleno",
            Self::Senior => "Senior",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SalaryBand {
    Entry,
    Mid,
    Senior,
}

impl Categorical for SalaryBand {
    const ALL: &'static [Self] = &[Self::Entry, Self::Mid, Self::Senior];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Mid => "Mid",
            Self::Senior => "Senior",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Location {
    Remoto,
    #[serde(rename = "Híbrido")]
    Hibrido,
    Presencial,
}

impl Categorical for Location {
    const ALL: &'static [Self] = &[Self::Remoto, Self::Hibrido, Self::Presencial];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Remoto => "Remoto",
            Self::Hibrido => "Híbrido",
            Self::Presencial => "Presencial",
        }
    }
}

macro_rules! categorical_text {
    ($ty:ty, $kind:literal) => {
        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CategoryParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as Categorical>::parse(s).ok_or_else(|| CategoryParseError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

categorical_text!(Department, "department");
categorical_text!(Level, "level");
categorical_text!(SalaryBand, "salary band");
categorical_text!(Location, "location");

/// One employee's input vector, exactly as the prediction backend expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeeFeatures {
    pub employee_id: u32,
    #[serde(rename = "idade")]
    pub age: u32,
    #[serde(rename = "tempo_empresa")]
    pub tenure_months: u32,
    #[serde(rename = "departamento")]
    pub department: Department,
    #[serde(rename = "nivel")]
    pub level: Level,
    #[serde(rename = "faixa_salarial")]
    pub salary_band: SalaryBand,
    #[serde(rename = "localizacao")]
    pub location: Location,
    #[serde(rename = "promovido", with = "flag")]
    pub was_promoted: bool,
    #[serde(rename = "aumento_salarial")]
    pub salary_increase_pct: f64,
    #[serde(rename = "manidader_change", with = "flag")]
    pub manager_changed: bool,
    #[serde(rename = "treinamentos")]
    pub training_count: u32,
    #[serde(rename = "avaliacao_performance")]
    pub performance_rating: f64,
    #[serde(rename = "avg_engidadement")]
    pub engagement: f64,
    #[serde(rename = "satisfacao_media")]
    pub satisfaction: f64,
    #[serde(rename = "reconhecimento_medio")]
    pub recognition: f64,
    #[serde(rename = "crescimento_medio")]
    pub growth: f64,
    #[serde(rename = "avg_manidader_rel")]
    pub manager_relationship: f64,
    #[serde(rename = "equilibrio_vida_trabalho_medio")]
    pub work_life_balance: f64,
}

/// Raw, possibly incomplete form snapshot coming from the view layer.
///
/// Categorical fields stay as text so unknown values can be reported
/// instead of being rejected by the deserializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmployeeForm {
    pub employee_id: Option<i64>,
    #[serde(rename = "idade")]
    pub age: Option<i64>,
    #[serde(rename = "tempo_empresa")]
    pub tenure_months: Option<i64>,
    #[serde(rename = "departamento")]
    pub department: Option<String>,
    #[serde(rename = "nivel")]
    pub level: Option<String>,
    #[serde(rename = "faixa_salarial")]
    pub salary_band: Option<String>,
    #[serde(rename = "localizacao")]
    pub location: Option<String>,
    #[serde(rename = "promovido", with = "optional_flag")]
    pub was_promoted: Option<bool>,
    #[serde(rename = "aumento_salarial")]
    pub salary_increase_pct: Option<f64>,
    #[serde(rename = "manidader_change", with = "optional_flag")]
    pub manager_changed: Option<bool>,
    #[serde(rename = "treinamentos")]
    pub training_count: Option<i64>,
    #[serde(rename = "avaliacao_performance")]
    pub performance_rating: Option<f64>,
    #[serde(rename = "avg_engidadement")]
    pub engagement: Option<f64>,
    #[serde(rename = "satisfacao_media")]
    pub satisfaction: Option<f64>,
    #[serde(rename = "reconhecimento_medio")]
    pub recognition: Option<f64>,
    #[serde(rename = "crescimento_medio")]
    pub growth: Option<f64>,
    #[serde(rename = "avg_manidader_rel")]
    pub manager_relationship: Option<f64>,
    #[serde(rename = "equilibrio_vida_trabalho_medio")]
    pub work_life_balance: Option<f64>,
}

impl EmployeeForm {
    /// The values the prediction screen is pre-filled with.
    pub fn sample() -> Self {
        Self {
            employee_id: Some(1),
            age: Some(30),
            tenure_months: Some(24),
            department: Some(Department::Engineering.to_string()),
            level: Some(Level::Pleno.to_string()),
            salary_band: Some(SalaryBand::Mid.to_string()),
            location: Some(Location::Hibrido.to_string()),
            was_promoted: Some(false),
            salary_increase_pct: Some(5.0),
            manager_changed: Some(false),
            training_count: Some(2),
            performance_rating: Some(3.5),
            engagement: Some(3.2),
            satisfaction: Some(3.1),
            recognition: Some(3.0),
            growth: Some(2.8),
            manager_relationship: Some(3.4),
            work_life_balance: Some(3.3),
        }
    }

    /// Overlays every field that is set in `other`.
    pub fn merge(self, other: EmployeeForm) -> Self {
        Self {
            employee_id: other.employee_id.or(self.employee_id),
            age: other.age.or(self.age),
            tenure_months: other.tenure_months.or(self.tenure_months),
            department: other.department.or(self.department),
            level: other.level.or(self.level),
            salary_band: other.salary_band.or(self.salary_band),
            location: other.location.or(self.location),
            was_promoted: other.was_promoted.or(self.was_promoted),
            salary_increase_pct: other.salary_increase_pct.or(self.salary_increase_pct),
            manager_changed: other.manager_changed.or(self.manager_changed),
            training_count: other.training_count.or(self.training_count),
            performance_rating: other.performance_rating.or(self.performance_rating),
            engagement: other.engagement.or(self.engagement),
            satisfaction: other.satisfaction.or(self.satisfaction),
            recognition: other.recognition.or(self.recognition),
            growth: other.growth.or(self.growth),
            manager_relationship: other.manager_relationship.or(self.manager_relationship),
            work_life_balance: other.work_life_balance.or(self.work_life_balance),
        }
    }
}

impl From<&EmployeeFeatures> for EmployeeForm {
    fn from(value: &EmployeeFeatures) -> Self {
        Self {
            employee_id: Some(i64::from(value.employee_id)),
            age: Some(i64::from(value.age)),
            tenure_months: Some(i64::from(value.tenure_months)),
            department: Some(value.department.to_string()),
            level: Some(value.level.to_string()),
            salary_band: Some(value.salary_band.to_string()),
            location: Some(value.location.to_string()),
            was_promoted: Some(value.was_promoted),
            salary_increase_pct: Some(value.salary_increase_pct),
            manager_changed: Some(value.manager_changed),
            training_count: Some(i64::from(value.training_count)),
            performance_rating: Some(value.performance_rating),
            engagement: Some(value.engagement),
            satisfaction: Some(value.satisfaction),
            recognition: Some(value.recognition),
            growth: Some(value.growth),
            manager_relationship: Some(value.manager_relationship),
            work_life_balance: Some(value.work_life_balance),
        }
    }
}

/// Event flags travel as 0/1 integers.
mod flag {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum RawFlag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    impl RawFlag {
        pub(super) fn into_bool(self) -> Option<bool> {
            match self {
                RawFlag::Bool(v) => Some(v),
                RawFlag::Int(0) => Some(false),
                RawFlag::Int(1) => Some(true),
                RawFlag::Text(s) => match s.trim() {
                    "0" | "false" => Some(false),
                    "1" | "true" => Some(true),
                    _ => None,
                },
                RawFlag::Int(_) => None,
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        RawFlag::deserialize(deserializer)?
            .into_bool()
            .ok_or_else(|| D::Error::custom("flag must be 0 or 1"))
    }
}

mod optional_flag {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::flag::RawFlag;

    pub fn serialize<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&u8::from(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        match Option::<RawFlag>::deserialize(deserializer)? {
            Some(raw) => raw
                .into_bool()
                .map(Some)
                .ok_or_else(|| D::Error::custom("flag must be 0 or 1")),
            None => Ok(None),
        }
    }
}
