//! Field set reconciliation for form collections

use crate::core::field::ID_FIELD;
use crate::core::form::FormSchemaField;
use std::collections::{BTreeSet, HashSet};

/// Column changes needed to go from the current fields to the desired ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub to_add: Vec<FormSchemaField>,
    pub to_modify: Vec<FormSchemaField>,
    pub to_remove: Vec<String>,
}

impl SchemaDiff {
    /// Split `desired` against `current`
    ///
    /// The identifier column is never removed, added or modified.
    pub fn compute(current: &BTreeSet<String>, desired: &[FormSchemaField]) -> Self {
        let desired = normalize_fields(desired);
        let desired_names: HashSet<&str> = desired.iter().map(|f| f.name.as_str()).collect();

        let to_remove = current
            .iter()
            .filter(|name| name.as_str() != ID_FIELD && !desired_names.contains(name.as_str()))
            .cloned()
            .collect();

        let (to_modify, to_add): (Vec<_>, Vec<_>) = desired
            .into_iter()
            .partition(|field| current.contains(&field.name));

        Self {
            to_add,
            to_modify,
            to_remove,
        }
    }
}

/// Drop identifier fields and duplicate names
///
/// When a name repeats, the last occurrence wins and keeps its position.
pub fn normalize_fields(fields: &[FormSchemaField]) -> Vec<FormSchemaField> {
    let mut seen = HashSet::new();
    let mut kept: Vec<FormSchemaField> = fields
        .iter()
        .rev()
        .filter(|field| field.name != ID_FIELD && seen.insert(field.name.as_str()))
        .cloned()
        .collect();
    kept.reverse();
    kept
}
