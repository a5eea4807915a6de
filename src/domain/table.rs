use crate::error::FieldViolation;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// How a primary-key path segment is parsed and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Int,
    Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct IdColumn {
    pub name: &'static str,
    pub kind: IdKind,
}

impl IdColumn {
    #[must_use]
    pub const fn new(name: &'static str, kind: IdKind) -> Self {
        Self { name, kind }
    }

    /// Parses a raw path segment into a typed value for this id column.
    pub fn parse_segment(&self, raw: &str) -> Result<ColumnValue, String> {
        match self.kind {
            IdKind::Int => raw
                .parse::<i64>()
                .map(ColumnValue::Int)
                .map_err(|_| format!("{} must be an integer", self.name)),
            IdKind::Uuid => Uuid::parse_str(raw)
                .map(ColumnValue::Uuid)
                .map_err(|_| format!("{} must be a UUID", self.name)),
        }
    }
}

/// List sort direction; anything that is not `ASC` (case-insensitive)
/// falls back to descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(v) if v.eq_ignore_ascii_case("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Email,
    Url,
}

/// A typed, validated value ready to be bound as a query parameter. Values
/// never travel as raw SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(OffsetDateTime),
    Null(FieldKind),
}

/// Declarative validator for one writable column.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub format: Option<TextFormat>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false, min_len: None, max_len: None, format: None, min: None, max: None }
    }

    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    #[must_use]
    pub const fn float(name: &'static str) -> Self {
        Self::new(name, FieldKind::Float)
    }

    #[must_use]
    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    #[must_use]
    pub const fn uuid(name: &'static str) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    #[must_use]
    pub const fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    #[must_use]
    pub const fn email(mut self) -> Self {
        self.format = Some(TextFormat::Email);
        self
    }

    #[must_use]
    pub const fn url(mut self) -> Self {
        self.format = Some(TextFormat::Url);
        self
    }

    #[must_use]
    pub const fn min(mut self, v: f64) -> Self {
        self.min = Some(v);
        self
    }

    #[must_use]
    pub const fn max(mut self, v: f64) -> Self {
        self.max = Some(v);
        self
    }

    /// Coerces and validates a JSON value against this field.
    pub fn check(&self, value: &Value) -> Result<ColumnValue, String> {
        if value.is_null() {
            if self.required {
                return Err("is required".into());
            }
            return Ok(ColumnValue::Null(self.kind));
        }

        match self.kind {
            FieldKind::Text => {
                let s = value.as_str().ok_or("must be a string")?;
                let len = s.chars().count();
                if let Some(min) = self.min_len
                    && len < min
                {
                    return Err(format!("must be at least {min} characters"));
                }
                if let Some(max) = self.max_len
                    && len > max
                {
                    return Err(format!("must be at most {max} characters"));
                }
                match self.format {
                    Some(TextFormat::Email) => {
                        let mut parts = s.splitn(2, '@');
                        let local = parts.next().unwrap_or_default();
                        let domain = parts.next().unwrap_or_default();
                        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
                            return Err("must be a valid email".into());
                        }
                    }
                    Some(TextFormat::Url) => {
                        if !s.starts_with("http://") && !s.starts_with("https://") {
                            return Err("must be a valid URL".into());
                        }
                    }
                    None => {}
                }
                Ok(ColumnValue::Text(s.to_string()))
            }
            FieldKind::Integer => {
                let n = value.as_i64().ok_or("must be an integer")?;
                self.check_range(n as f64)?;
                Ok(ColumnValue::Int(n))
            }
            FieldKind::Float => {
                let n = value.as_f64().ok_or("must be a number")?;
                self.check_range(n)?;
                Ok(ColumnValue::Float(n))
            }
            FieldKind::Boolean => value.as_bool().map(ColumnValue::Bool).ok_or_else(|| "must be a boolean".into()),
            FieldKind::Uuid => {
                let s = value.as_str().ok_or("must be a UUID string")?;
                Uuid::parse_str(s).map(ColumnValue::Uuid).map_err(|_| "must be a valid UUID".into())
            }
            FieldKind::Timestamp => {
                let s = value.as_str().ok_or("must be an RFC 3339 timestamp string")?;
                OffsetDateTime::parse(s, &Rfc3339)
                    .map(ColumnValue::Timestamp)
                    .map_err(|_| "must be a valid RFC 3339 timestamp".into())
            }
        }
    }

    fn check_range(&self, n: f64) -> Result<(), String> {
        if let Some(min) = self.min
            && n < min
        {
            return Err(format!("must be at least {min}"));
        }
        if let Some(max) = self.max
            && n > max
        {
            return Err(format!("must be at most {max}"));
        }
        Ok(())
    }
}

/// Static description of one CRUD-exposed table. Table and column names only
/// ever come from these descriptors, never from request input.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub id_columns: Vec<IdColumn>,
    pub fields: Vec<FieldSpec>,
    pub write_requires_auth: bool,
}

/// A validated change-set: column names paired with typed bind values.
pub type ChangeSet = Vec<(&'static str, ColumnValue)>;

impl TableDescriptor {
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Resolves the ORDER BY column: a declared field name passes through,
    /// anything else falls back to the first id column.
    #[must_use]
    pub fn sort_column(&self, requested: Option<&str>) -> &'static str {
        match requested {
            Some(name) => self
                .fields
                .iter()
                .map(|f| f.name)
                .find(|n| *n == name)
                .unwrap_or(self.id_columns[0].name),
            None => self.id_columns[0].name,
        }
    }

    /// Strict validation for create and full update: every declared field is
    /// checked, unknown fields are rejected, and all violations are itemized.
    pub fn validate_full(&self, body: &Value) -> Result<ChangeSet, Vec<FieldViolation>> {
        let Some(map) = body.as_object() else {
            return Err(vec![FieldViolation::new("body", "must be a JSON object")]);
        };

        let mut violations = Vec::new();
        let mut change_set = ChangeSet::new();

        for key in map.keys() {
            if !self.has_field(key) {
                violations.push(FieldViolation::new(key.clone(), "unknown field"));
            }
        }

        for field in &self.fields {
            match map.get(field.name) {
                None => {
                    if field.required {
                        violations.push(FieldViolation::new(field.name, "is required"));
                    }
                }
                Some(value) => match field.check(value) {
                    Ok(v) => change_set.push((field.name, v)),
                    Err(msg) => violations.push(FieldViolation::new(field.name, msg)),
                },
            }
        }

        if violations.is_empty() { Ok(change_set) } else { Err(violations) }
    }

    /// Lenient validation for partial update: unknown fields are silently
    /// dropped and missing fields are not an error. Provided values must
    /// still satisfy their field spec.
    pub fn validate_partial(&self, body: &Value) -> Result<ChangeSet, Vec<FieldViolation>> {
        let Some(map) = body.as_object() else {
            return Err(vec![FieldViolation::new("body", "must be a JSON object")]);
        };

        let mut violations = Vec::new();
        let mut change_set = ChangeSet::new();

        for field in &self.fields {
            if let Some(value) = map.get(field.name) {
                match field.check(value) {
                    Ok(v) => change_set.push((field.name, v)),
                    Err(msg) => violations.push(FieldViolation::new(field.name, msg)),
                }
            }
        }

        if violations.is_empty() { Ok(change_set) } else { Err(violations) }
    }
}
