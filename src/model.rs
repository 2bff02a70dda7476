use serde_json::{Map, Number, Value as JsonValue};

/// A persisted row as it travels over the wire: column name to scalar.
pub type Record = Map<String, JsonValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Real,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Value must be one of the listed strings.
    OneOf(&'static [&'static str]),
    /// Number must be strictly greater than zero.
    Positive,
    /// Text must be a `YYYY-MM-DD` calendar date.
    IsoDate,
}

/// A writable column. Server-managed columns (`id`, `created_at`,
/// `updated_at`) are never listed.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
    pub default: Option<&'static str>,
    pub rules: &'static [Rule],
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Column {
            name,
            kind: ColumnKind::Text,
            required: false,
            default: None,
            rules: &[],
        }
    }

    pub const fn real(name: &'static str) -> Self {
        Column {
            kind: ColumnKind::Real,
            ..Column::text(name)
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Column {
            kind: ColumnKind::Integer,
            ..Column::text(name)
        }
    }

    pub const fn required(self) -> Self {
        Column { required: true, ..self }
    }

    pub const fn default_text(self, value: &'static str) -> Self {
        Column {
            default: Some(value),
            ..self
        }
    }

    pub const fn rules(self, rules: &'static [Rule]) -> Self {
        Column { rules, ..self }
    }
}

/// Read-side projection for resources that expose joined display fields.
#[derive(Debug, Clone, Copy)]
pub struct View {
    /// `SELECT ... FROM ... JOIN ...` without a WHERE or ORDER BY clause.
    pub select: &'static str,
    /// Qualified id column used for lookups through the view.
    pub id_column: &'static str,
}

/// Rows in another table that reference this resource and block its deletion.
#[derive(Debug, Clone, Copy)]
pub struct Dependent {
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub message: &'static str,
}

#[derive(Debug)]
pub struct ResourceDescriptor {
    /// Singular display name used in messages, e.g. "Category".
    pub name: &'static str,
    /// Path below `/api`, e.g. "finance/categories".
    pub path: &'static str,
    pub table: &'static str,
    pub columns: &'static [Column],
    pub view: Option<View>,
    pub order_by: &'static str,
    pub touch_updated_at: bool,
    pub dependents: &'static [Dependent],
}

impl ResourceDescriptor {
    pub fn select_sql(&self) -> String {
        match &self.view {
            Some(view) => view.select.to_string(),
            None => format!("SELECT * FROM {}", self.table),
        }
    }

    pub fn id_column(&self) -> &'static str {
        self.view.map(|v| v.id_column).unwrap_or("id")
    }

    pub fn not_found(&self) -> String {
        format!("{} not found", self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Converts a store value to JSON. Integral reals are emitted as integers so
/// that an amount submitted as `1500` reads back as `1500`.
pub fn to_json(value: libsql::Value) -> JsonValue {
    match value {
        libsql::Value::Null => JsonValue::Null,
        libsql::Value::Integer(i) => JsonValue::from(i),
        libsql::Value::Real(f) => {
            if f.fract() == 0.0 && f.abs() < 9.0e15 {
                JsonValue::from(f as i64)
            } else {
                Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null)
            }
        }
        libsql::Value::Text(s) => JsonValue::String(s),
        libsql::Value::Blob(_) => JsonValue::Null,
    }
}

pub fn row_to_record(row: &libsql::Row) -> anyhow::Result<Record> {
    let mut record = Record::new();
    for idx in 0..row.column_count() {
        let name = row
            .column_name(idx)
            .ok_or_else(|| anyhow::anyhow!("missing name for column {idx}"))?
            .to_string();
        record.insert(name, to_json(row.get_value(idx)?));
    }
    Ok(record)
}
