use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::employee::{
    Categorical, Department, EmployeeFeatures, EmployeeForm, Level, Location, SalaryBand,
};

pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 70;
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

const MAX_COUNT: i64 = u32::MAX as i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    Missing,
    OutOfRange,
    InvalidEnumValue,
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Missing => "MISSING",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::InvalidEnumValue => "INVALID_ENUM_VALUE",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: Reason,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: Reason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.field, self.reason)
    }
}

/// Every problem found in one input, in field order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, reason: Reason) -> Self {
        Self(vec![FieldError::new(field, reason)])
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        self.0.extend(
            other
                .0
                .into_iter()
                .map(|e| FieldError::new(format!("{prefix}.{}", e.field), e.reason)),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(value: Vec<FieldError>) -> Self {
        Self(value)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} invalid field(s): {joined}", self.0.len())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    EmployeeId,
    Age,
    TenureMonths,
    Department,
    Level,
    SalaryBand,
    Location,
    WasPromoted,
    SalaryIncreasePct,
    ManagerChanged,
    TrainingCount,
    PerformanceRating,
    Engagement,
    Satisfaction,
    Recognition,
    Growth,
    ManagerRelationship,
    WorkLifeBalance,
}

impl Field {
    /// Form order; errors are reported in this order.
    pub const ALL: [Field; 18] = [
        Field::EmployeeId,
        Field::Age,
        Field::TenureMonths,
        Field::Department,
        Field::Level,
        Field::SalaryBand,
        Field::Location,
        Field::WasPromoted,
        Field::SalaryIncreasePct,
        Field::ManagerChanged,
        Field::TrainingCount,
        Field::PerformanceRating,
        Field::Engagement,
        Field::Satisfaction,
        Field::Recognition,
        Field::Growth,
        Field::ManagerRelationship,
        Field::WorkLifeBalance,
    ];

    /// Wire key, shared by the form and the backend payload.
    pub fn key(self) -> &'static str {
        match self {
            Self::EmployeeId => "employee_id",
            Self::Age => "idade",
            Self::TenureMonths => "tempo_empresa",
            Self::Department => "departamento",
            Self::Level => "nivel",
            Self::SalaryBand => "faixa_salarial",
            Self::Location => "localizacao",
            Self::WasPromoted => "promovido",
            Self::SalaryIncreasePct => "aumento_salarial",
            Self::ManagerChanged => "manidader_change",
            Self::TrainingCount => "treinamentos",
            Self::PerformanceRating => "avaliacao_performance",
            Self::Engagement => "avg_engidadement",
            Self::Satisfaction => "satisfacao_media",
            Self::Recognition => "reconhecimento_medio",
            Self::Growth => "crescimento_medio",
            Self::ManagerRelationship => "avg_manidader_rel",
            Self::WorkLifeBalance => "equilibrio_vida_trabalho_medio",
        }
    }

    pub fn rule(self) -> Rule {
        match self {
            Self::EmployeeId | Self::TenureMonths => Rule::Integer {
                min: 1,
                max: MAX_COUNT,
            },
            Self::Age => Rule::Integer {
                min: MIN_AGE,
                max: MAX_AGE,
            },
            Self::TrainingCount => Rule::Integer {
                min: 0,
                max: MAX_COUNT,
            },
            Self::Department => Rule::Choice(parse_ok::<Department>),
            Self::Level => Rule::Choice(parse_ok::<Level>),
            Self::SalaryBand => Rule::Choice(parse_ok::<SalaryBand>),
            Self::Location => Rule::Choice(parse_ok::<Location>),
            Self::WasPromoted | Self::ManagerChanged => Rule::Required,
            Self::SalaryIncreasePct => Rule::Number {
                min: 0.0,
                max: f64::MAX,
            },
            Self::PerformanceRating
            | Self::Engagement
            | Self::Satisfaction
            | Self::Recognition
            | Self::Growth
            | Self::ManagerRelationship
            | Self::WorkLifeBalance => Rule::Number {
                min: MIN_SCORE,
                max: MAX_SCORE,
            },
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

fn parse_ok<T: Categorical>(raw: &str) -> bool {
    T::parse(raw).is_some()
}

/// A field's value as the rules see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Missing,
    Int(i64),
    Number(f64),
    Flag(bool),
    Text(&'a str),
    /// Present, but of a JSON type the field cannot hold.
    Mistyped,
}

impl<'a> From<Option<i64>> for FieldValue<'a> {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Int)
    }
}

impl<'a> From<Option<f64>> for FieldValue<'a> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Number)
    }
}

impl<'a> From<Option<bool>> for FieldValue<'a> {
    fn from(value: Option<bool>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Flag)
    }
}

impl<'a> From<Option<&'a str>> for FieldValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(text) if !text.trim().is_empty() => FieldValue::Text(text),
            _ => FieldValue::Missing,
        }
    }
}

/// Independent per-field constraint. Bounds are inclusive.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required,
    Integer { min: i64, max: i64 },
    Number { min: f64, max: f64 },
    /// Membership test over a closed set of values.
    Choice(fn(&str) -> bool),
}

impl Rule {
    pub fn check(&self, value: FieldValue<'_>) -> Result<(), Reason> {
        match (self, value) {
            (_, FieldValue::Missing) => Err(Reason::Missing),
            (Rule::Choice(_), FieldValue::Mistyped) => Err(Reason::InvalidEnumValue),
            (_, FieldValue::Mistyped) => Err(Reason::OutOfRange),
            (Rule::Required, _) => Ok(()),
            (Rule::Integer { min, max }, FieldValue::Int(v)) => {
                in_range((*min..=*max).contains(&v))
            }
            (Rule::Number { min, max }, FieldValue::Number(v)) => {
                in_range((*min..=*max).contains(&v))
            }
            (Rule::Number { min, max }, FieldValue::Int(v)) => {
                in_range((*min..=*max).contains(&(v as f64)))
            }
            (Rule::Choice(accepts), FieldValue::Text(text)) => {
                if accepts(text) {
                    Ok(())
                } else {
                    Err(Reason::InvalidEnumValue)
                }
            }
            (Rule::Choice(_), _) => Err(Reason::InvalidEnumValue),
            _ => Err(Reason::OutOfRange),
        }
    }
}

fn in_range(contained: bool) -> Result<(), Reason> {
    if contained {
        Ok(())
    } else {
        Err(Reason::OutOfRange)
    }
}

impl EmployeeForm {
    pub fn value(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::EmployeeId => self.employee_id.into(),
            Field::Age => self.age.into(),
            Field::TenureMonths => self.tenure_months.into(),
            Field::Department => self.department.as_deref().into(),
            Field::Level => self.level.as_deref().into(),
            Field::SalaryBand => self.salary_band.as_deref().into(),
            Field::Location => self.location.as_deref().into(),
            Field::WasPromoted => self.was_promoted.into(),
            Field::SalaryIncreasePct => self.salary_increase_pct.into(),
            Field::ManagerChanged => self.manager_changed.into(),
            Field::TrainingCount => self.training_count.into(),
            Field::PerformanceRating => self.performance_rating.into(),
            Field::Engagement => self.engagement.into(),
            Field::Satisfaction => self.satisfaction.into(),
            Field::Recognition => self.recognition.into(),
            Field::Growth => self.growth.into(),
            Field::ManagerRelationship => self.manager_relationship.into(),
            Field::WorkLifeBalance => self.work_life_balance.into(),
        }
    }

    fn to_features(&self) -> Option<EmployeeFeatures> {
        let count = |v: Option<i64>| v.and_then(|n| u32::try_from(n).ok());
        Some(EmployeeFeatures {
            employee_id: count(self.employee_id)?,
            age: count(self.age)?,
            tenure_months: count(self.tenure_months)?,
            department: Department::parse(self.department.as_deref()?)?,
            level: Level::parse(self.level.as_deref()?)?,
            salary_band: SalaryBand::parse(self.salary_band.as_deref()?)?,
            location: Location::parse(self.location.as_deref()?)?,
            was_promoted: self.was_promoted?,
            salary_increase_pct: self.salary_increase_pct?,
            manager_changed: self.manager_changed?,
            training_count: count(self.training_count)?,
            performance_rating: self.performance_rating?,
            engagement: self.engagement?,
            satisfaction: self.satisfaction?,
            recognition: self.recognition?,
            growth: self.growth?,
            manager_relationship: self.manager_relationship?,
            work_life_balance: self.work_life_balance?,
        })
    }
}

/// Re-checks one field of the snapshot, e.g. after the user edits it.
pub fn validate_field(form: &EmployeeForm, field: Field) -> Option<FieldError> {
    check_value(field, form.value(field))
}

fn check_value(field: Field, value: FieldValue<'_>) -> Option<FieldError> {
    field
        .rule()
        .check(value)
        .err()
        .map(|reason| FieldError::new(field.key(), reason))
}

/// Checks every field and builds the typed record when all of them pass.
pub fn validate(form: &EmployeeForm) -> Result<EmployeeFeatures, ValidationErrors> {
    validate_with(form, &[])
}

fn validate_with(
    form: &EmployeeForm,
    mistyped: &[Field],
) -> Result<EmployeeFeatures, ValidationErrors> {
    let errors: ValidationErrors = Field::ALL
        .iter()
        .filter_map(|field| {
            let value = if mistyped.contains(field) {
                FieldValue::Mistyped
            } else {
                form.value(*field)
            };
            check_value(*field, value)
        })
        .collect::<Vec<_>>()
        .into();
    errors.into_result()?;
    form.to_features()
        .ok_or_else(|| ValidationErrors::single("form", Reason::Missing))
}

/// A form body read one field at a time, so a value of the wrong JSON type
/// spoils only its own field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedForm {
    pub form: EmployeeForm,
    pub mistyped: Vec<Field>,
}

impl DecodedForm {
    /// Anything other than a JSON object decodes as an empty form.
    pub fn from_json(body: &Value) -> Self {
        let mut decoded = Self::default();
        let Some(object) = body.as_object() else {
            return decoded;
        };
        for field in Field::ALL {
            let Some(raw) = object.get(field.key()) else {
                continue;
            };
            let mut single = Map::new();
            single.insert(field.key().to_string(), raw.clone());
            match serde_json::from_value::<EmployeeForm>(Value::Object(single)) {
                Ok(part) => decoded.form = decoded.form.merge(part),
                Err(_) => decoded.mistyped.push(field),
            }
        }
        decoded
    }

    pub fn validate(&self) -> Result<EmployeeFeatures, ValidationErrors> {
        validate_with(&self.form, &self.mistyped)
    }
}

/// Same rules applied to an already typed record.
pub fn check_features(features: &EmployeeFeatures) -> Result<(), ValidationErrors> {
    validate(&EmployeeForm::from(features)).map(|_| ())
}
