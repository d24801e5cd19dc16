//! Form field types and the storage columns they map to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the generated identifier column of every form collection
pub const ID_FIELD: &str = "id";

/// Input type of a form field, as authored in the form builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldType {
    Text,
    Textarea,
    Checkbox,
    Radio,
    Select,
    Number,
    Decimal,
    Email,
    Date,
    Range,
    Tel,
    File,
}

impl FormFieldType {
    /// Storage column used for submissions of this field
    pub fn column_type(self) -> ColumnType {
        match self {
            FormFieldType::Text
            | FormFieldType::Checkbox
            | FormFieldType::Radio
            | FormFieldType::Select
            | FormFieldType::Email
            | FormFieldType::Range
            | FormFieldType::Tel
            | FormFieldType::File => ColumnType::String,
            FormFieldType::Textarea => ColumnType::Text,
            FormFieldType::Number => ColumnType::Float,
            FormFieldType::Decimal => ColumnType::Decimal,
            FormFieldType::Date => ColumnType::DateTime,
        }
    }
}

/// Physical column type of a form collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    String,
    Text,
    Float,
    Decimal,
    DateTime,
}

impl ColumnType {
    /// PostgreSQL type used in DDL statements
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::String => "varchar(255)",
            ColumnType::Text => "text",
            ColumnType::Float => "real",
            ColumnType::Decimal => "numeric(8, 2)",
            ColumnType::DateTime => "timestamptz",
        }
    }

    /// Reverse of [`sql_type`](Self::sql_type) for `information_schema.columns.data_type`
    ///
    /// Returns `None` for types this crate never creates.
    pub fn from_sql_type(data_type: &str) -> Option<Self> {
        match data_type {
            "character varying" | "varchar" => Some(ColumnType::String),
            "text" => Some(ColumnType::Text),
            "real" => Some(ColumnType::Float),
            "numeric" => Some(ColumnType::Decimal),
            "timestamp with time zone" | "timestamptz" => Some(ColumnType::DateTime),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// A column to create or alter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_form_type_maps_to_a_column() {
        let cases = [
            ("text", ColumnType::String),
            ("textarea", ColumnType::Text),
            ("checkbox", ColumnType::String),
            ("radio", ColumnType::String),
            ("select", ColumnType::String),
            ("number", ColumnType::Float),
            ("decimal", ColumnType::Decimal),
            ("email", ColumnType::String),
            ("date", ColumnType::DateTime),
            ("range", ColumnType::String),
            ("tel", ColumnType::String),
            ("file", ColumnType::String),
        ];

        for (name, expected) in cases {
            let field_type: FormFieldType =
                serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(field_type.column_type(), expected, "{name}");
        }
    }

    #[test]
    fn test_unknown_form_type_is_rejected() {
        let result = serde_json::from_value::<FormFieldType>(serde_json::json!("color"));
        assert!(result.is_err());
    }

    #[test]
    fn test_sql_type_reverse_lookup() {
        for column_type in [
            ColumnType::String,
            ColumnType::Text,
            ColumnType::Float,
            ColumnType::Decimal,
            ColumnType::DateTime,
        ] {
            let data_type = match column_type {
                ColumnType::String => "character varying",
                ColumnType::Text => "text",
                ColumnType::Float => "real",
                ColumnType::Decimal => "numeric",
                ColumnType::DateTime => "timestamp with time zone",
            };
            assert_eq!(ColumnType::from_sql_type(data_type), Some(column_type));
        }
        assert_eq!(ColumnType::from_sql_type("jsonb"), None);
    }
}
