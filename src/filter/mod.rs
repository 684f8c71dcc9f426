//! Declarative filter state: per-field condition lists.
//!
//! A field is either unfiltered (absent from the state) or carries at least
//! one condition. Removing the last condition of a field removes the field
//! entry itself, so an empty condition list can never be observed.

pub mod params;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Earliest start time in the dataset (1979-01-01 CET, in milliseconds).
pub const DATASET_EPOCH_MS: i64 = 283_993_200_000;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
    Neq,
}

impl Operator {
    /// Name used in query parameter keys (`field__gte`).
    pub fn wire_name(&self) -> &'static str {
        match self {
            Operator::Gte => "gte",
            Operator::Gt => "gt",
            Operator::Lte => "lte",
            Operator::Lt => "lt",
            Operator::Eq => "eq",
            Operator::Neq => "neq",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gte => "≥",
            Operator::Gt => ">",
            Operator::Lte => "≤",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Neq => "≠",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "gte" => Some(Operator::Gte),
            "gt" => Some(Operator::Gt),
            "lte" => Some(Operator::Lte),
            "lt" => Some(Operator::Lt),
            "eq" => Some(Operator::Eq),
            "neq" => Some(Operator::Neq),
            _ => None,
        }
    }

    pub fn all() -> [Operator; 6] {
        [
            Operator::Gte,
            Operator::Gt,
            Operator::Lte,
            Operator::Lt,
            Operator::Eq,
            Operator::Neq,
        ]
    }
}

/// The closed set of filterable fields for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Area,
    Length,
    SeverityIndex,
    StartTime,
}

impl FieldName {
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldName::Area => "area",
            FieldName::Length => "length",
            FieldName::SeverityIndex => "severity_index",
            FieldName::StartTime => "start_time",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldName::Area => "Area",
            FieldName::Length => "Length",
            FieldName::SeverityIndex => "Severity index",
            FieldName::StartTime => "Start date",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "area" => Some(FieldName::Area),
            "length" => Some(FieldName::Length),
            "severity_index" => Some(FieldName::SeverityIndex),
            "start_time" => Some(FieldName::StartTime),
            _ => None,
        }
    }

    pub fn all() -> [FieldName; 4] {
        [
            FieldName::Area,
            FieldName::Length,
            FieldName::SeverityIndex,
            FieldName::StartTime,
        ]
    }

    /// Input constraints and default condition per field. Min/max/step are
    /// edit-time constraints for the UI, not stored invariants.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldName::Area | FieldName::SeverityIndex => FieldKind::Numeric {
                min: 0.0,
                max: f64::MAX,
                step: 0.01,
            },
            FieldName::Length => FieldKind::Numeric {
                min: 0.0,
                max: f64::MAX,
                step: 1.0,
            },
            FieldName::StartTime => FieldKind::Timestamp,
        }
    }

    pub fn default_condition(&self) -> FilterCondition {
        let value = match self.kind() {
            FieldKind::Numeric { min, .. } => FilterValue::Number(min),
            FieldKind::Timestamp => FilterValue::Timestamp(DATASET_EPOCH_MS),
        };
        FilterCondition {
            operator: Operator::Gte,
            value,
            enabled: true,
        }
    }
}

/// How a field's value is edited and serialized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Numeric { min: f64, max: f64, step: f64 },
    Timestamp,
}

/// A condition value: plain number or a millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    Number(f64),
    Timestamp(i64),
}

impl FilterValue {
    /// Wire representation: ISO-8601 for timestamps, the literal number
    /// otherwise (no locale formatting).
    pub fn serialize_for_query(&self) -> String {
        match self {
            FilterValue::Number(n) => format!("{n}"),
            FilterValue::Timestamp(ms) => match Utc.timestamp_millis_opt(*ms).single() {
                Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                None => ms.to_string(),
            },
        }
    }
}

/// One operator/value pair. Disabled conditions stay in state and in the UI
/// but are excluded from query serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub operator: Operator,
    pub value: FilterValue,
    pub enabled: bool,
}

/// Partial update for a condition; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionPatch {
    pub operator: Option<Operator>,
    pub value: Option<FilterValue>,
    pub enabled: Option<bool>,
}

/// All conditions of one field. Invariant: `conditions` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub label: String,
    pub conditions: Vec<FilterCondition>,
}

/// Active filters, keyed by field. Absence of a key means unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersState {
    fields: BTreeMap<FieldName, FieldFilter>,
}

impl FiltersState {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: FieldName) -> Option<&FieldFilter> {
        self.fields.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldFilter)> {
        self.fields.iter().map(|(field, filter)| (*field, filter))
    }

    /// Fields that can still be added: the declared universe minus fields
    /// already present. Feeds the "Filter by..." dropdown.
    pub fn addable_fields(&self) -> Vec<FieldName> {
        FieldName::all()
            .into_iter()
            .filter(|field| !self.fields.contains_key(field))
            .collect()
    }

    /// Insert a field with exactly its declared default condition.
    /// Adding a field that is already present is a no-op.
    pub fn add_filter(&mut self, field: FieldName) {
        self.fields.entry(field).or_insert_with(|| FieldFilter {
            label: field.label().to_string(),
            conditions: vec![field.default_condition()],
        });
    }

    /// Append the field's default condition to its list.
    pub fn add_condition(&mut self, field: FieldName) {
        self.field_mut(field)
            .conditions
            .push(field.default_condition());
    }

    /// Apply a patch at `index`. An out-of-range index or an absent field is
    /// a programming error and panics.
    pub fn update_condition(&mut self, field: FieldName, index: usize, patch: ConditionPatch) {
        let condition = &mut self.field_mut(field).conditions[index];
        if let Some(operator) = patch.operator {
            condition.operator = operator;
        }
        if let Some(value) = patch.value {
            condition.value = value;
        }
        if let Some(enabled) = patch.enabled {
            condition.enabled = enabled;
        }
    }

    /// Flip the enabled flag at `index`.
    pub fn toggle_condition(&mut self, field: FieldName, index: usize) {
        let condition = &mut self.field_mut(field).conditions[index];
        condition.enabled = !condition.enabled;
    }

    /// Remove the condition at `index`; removing the sole condition removes
    /// the whole field entry.
    pub fn delete_condition(&mut self, field: FieldName, index: usize) {
        let filter = self.field_mut(field);
        filter.conditions.remove(index);
        if filter.conditions.is_empty() {
            self.fields.remove(&field);
        }
    }

    fn field_mut(&mut self, field: FieldName) -> &mut FieldFilter {
        match self.fields.get_mut(&field) {
            Some(filter) => filter,
            None => panic!("no active filter for field {field:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_filter_inserts_default_condition() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Area);

        let filter = filters.get(FieldName::Area).unwrap();
        assert_eq!(filter.label, "Area");
        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(
            filter.conditions[0],
            FilterCondition {
                operator: Operator::Gte,
                value: FilterValue::Number(0.0),
                enabled: true,
            }
        );
    }

    #[test]
    fn start_time_defaults_to_dataset_epoch() {
        let condition = FieldName::StartTime.default_condition();
        assert_eq!(condition.operator, Operator::Gte);
        assert_eq!(condition.value, FilterValue::Timestamp(DATASET_EPOCH_MS));
        assert!(condition.enabled);
    }

    #[test]
    fn deleting_sole_condition_removes_field() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Length);
        filters.delete_condition(FieldName::Length, 0);

        assert!(filters.get(FieldName::Length).is_none());
        assert!(filters.is_empty());
    }

    #[test]
    fn deleting_one_of_many_keeps_the_field() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Length);
        filters.add_condition(FieldName::Length);
        filters.update_condition(
            FieldName::Length,
            1,
            ConditionPatch {
                operator: Some(Operator::Lt),
                value: Some(FilterValue::Number(10.0)),
                ..Default::default()
            },
        );

        filters.delete_condition(FieldName::Length, 0);
        let filter = filters.get(FieldName::Length).unwrap();
        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(filter.conditions[0].operator, Operator::Lt);
    }

    #[test]
    fn toggle_flips_enabled_and_keeps_condition() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::SeverityIndex);
        filters.toggle_condition(FieldName::SeverityIndex, 0);

        let filter = filters.get(FieldName::SeverityIndex).unwrap();
        assert!(!filter.conditions[0].enabled);

        filters.toggle_condition(FieldName::SeverityIndex, 0);
        assert!(filters.get(FieldName::SeverityIndex).unwrap().conditions[0].enabled);
    }

    #[test]
    fn addable_fields_excludes_present_ones() {
        let mut filters = FiltersState::default();
        assert_eq!(filters.addable_fields().len(), 4);

        filters.add_filter(FieldName::Area);
        filters.add_filter(FieldName::StartTime);
        let addable = filters.addable_fields();
        assert_eq!(addable, vec![FieldName::Length, FieldName::SeverityIndex]);
    }

    #[test]
    fn add_filter_twice_does_not_duplicate() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Area);
        filters.add_condition(FieldName::Area);
        filters.add_filter(FieldName::Area);
        assert_eq!(filters.get(FieldName::Area).unwrap().conditions.len(), 2);
    }

    #[test]
    #[should_panic]
    fn out_of_range_update_fails_loudly() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Area);
        filters.update_condition(FieldName::Area, 5, ConditionPatch::default());
    }
}
