//! Forms and the CMS metadata rows of their submission collections

use crate::core::events::ItemKey;
use crate::core::field::{ColumnDef, FormFieldType, ID_FIELD};
use serde::{Deserialize, Serialize};

/// Metadata group every form submission collection is filed under
pub const FORM_SUBMISSIONS_GROUP: &str = "form_submission_models";

/// One field of a form definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FormFieldType,
}

impl FormSchemaField {
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn column(&self) -> ColumnDef {
        ColumnDef::new(&self.name, self.field_type.column_type())
    }
}

/// A `forms` item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemKey>,
    /// Name of the collection holding the submissions
    pub key: String,
    #[serde(default)]
    pub schema: Vec<FormSchemaField>,
}

/// Row of `directus_collections`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub collection: String,
    pub singleton: bool,
    pub sort_field: String,
    pub accountability: String,
    pub group: String,
    pub versioning: bool,
    pub hidden: bool,
    pub archive_app_filter: bool,
}

impl CollectionMeta {
    pub fn form_submissions(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            singleton: false,
            sort_field: ID_FIELD.to_string(),
            accountability: "all".to_string(),
            group: FORM_SUBMISSIONS_GROUP.to_string(),
            versioning: false,
            hidden: false,
            archive_app_filter: true,
        }
    }
}

/// Row of `directus_fields`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub collection: String,
    pub field: String,
    pub special: Option<String>,
    pub interface: String,
    pub required: bool,
    pub sort: i32,
    pub width: String,
    pub readonly: bool,
    pub hidden: bool,
}

impl FieldMeta {
    /// Metadata of the generated identifier column
    pub fn identifier(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: ID_FIELD.to_string(),
            special: Some("uuid".to_string()),
            interface: "input".to_string(),
            required: true,
            sort: 0,
            width: "full".to_string(),
            readonly: true,
            hidden: false,
        }
    }

    /// Metadata of a form field at `index` in the form schema
    pub fn for_field(collection: impl Into<String>, field: impl Into<String>, index: usize) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            special: None,
            interface: "input".to_string(),
            required: true,
            sort: i32::try_from(index + 1).unwrap_or(i32::MAX),
            width: "full".to_string(),
            readonly: false,
            hidden: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::ColumnType;
    use serde_json::json;

    #[test]
    fn test_form_from_payload() {
        let form: Form = serde_json::from_value(json!({
            "key": "contact",
            "schema": [
                {"name": "email", "type": "email"},
                {"name": "message", "type": "textarea"}
            ]
        }))
        .unwrap();

        assert_eq!(form.key, "contact");
        assert_eq!(form.schema.len(), 2);
        assert_eq!(form.schema[1].column().column_type, ColumnType::Text);
    }

    #[test]
    fn test_field_meta_sort_starts_after_identifier() {
        assert_eq!(FieldMeta::identifier("contact").sort, 0);
        assert_eq!(FieldMeta::for_field("contact", "email", 0).sort, 1);
        assert_eq!(FieldMeta::for_field("contact", "phone", 4).sort, 5);
    }
}
