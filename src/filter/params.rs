//! Translation of filter state into the backend's query parameter contract.
//!
//! The backend parses its query string as a multimap, so the translator
//! produces ordered key/value pairs rather than a flat map. Duplicate
//! `field__operator` keys from multiple enabled conditions on the same field
//! are preserved, not silently overwritten.

use super::{FieldName, FiltersState, Operator};

/// Ancillary parameters appended verbatim after the filter conditions.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub fields: Vec<&'static str>,
    pub limit: Option<usize>,
    pub bins: Option<usize>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// One enabled condition as `("{field}__{operator}", value)`.
pub fn filter_params(filters: &FiltersState) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (field, filter) in filters.iter() {
        for condition in filter.conditions.iter().filter(|c| c.enabled) {
            pairs.push((
                format!("{}__{}", field.wire_name(), condition.operator.wire_name()),
                condition.value.serialize_for_query(),
            ));
        }
    }
    pairs
}

/// Canonical query string: filter conditions first, ancillary parameters
/// after, values percent-encoded.
pub fn query_string(filters: &FiltersState, options: &QueryOptions) -> String {
    let mut pairs = filter_params(filters);

    for field in &options.fields {
        pairs.push(("fields".to_string(), field.to_string()));
    }
    if let Some(limit) = options.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(bins) = options.bins {
        pairs.push(("bins".to_string(), bins.to_string()));
    }
    if let Some(ref start) = options.start {
        pairs.push(("start".to_string(), start.clone()));
    }
    if let Some(ref end) = options.end {
        pairs.push(("end".to_string(), end.clone()));
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Split a `field__operator` key back into its parts. Returns `None` for
/// ancillary keys such as `limit` or `fields`.
pub fn parse_key(key: &str) -> Option<(FieldName, Operator)> {
    let (field, operator) = key.split_once("__")?;
    Some((
        FieldName::from_wire_name(field)?,
        Operator::from_wire_name(operator)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ConditionPatch, FilterValue, DATASET_EPOCH_MS};

    #[test]
    fn enabled_conditions_serialize_with_composite_keys() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Length);
        filters.update_condition(
            FieldName::Length,
            0,
            ConditionPatch {
                operator: Some(Operator::Lt),
                value: Some(FilterValue::Number(123.0)),
                ..Default::default()
            },
        );

        let pairs = filter_params(&filters);
        assert_eq!(pairs, vec![("length__lt".to_string(), "123".to_string())]);
    }

    #[test]
    fn disabled_conditions_are_omitted_entirely() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Area);
        filters.add_condition(FieldName::Area);
        filters.update_condition(
            FieldName::Area,
            1,
            ConditionPatch {
                operator: Some(Operator::Neq),
                value: Some(FilterValue::Number(1.0)),
                enabled: Some(false),
            },
        );

        let pairs = filter_params(&filters);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "area__gte");
    }

    #[test]
    fn timestamps_serialize_as_iso8601() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::StartTime);

        let pairs = filter_params(&filters);
        assert_eq!(pairs[0].0, "start_time__gte");
        // 283_993_200_000 ms = 1978-12-31T23:00:00Z (1979-01-01 CET)
        assert_eq!(pairs[0].1, "1978-12-31T23:00:00Z");
    }

    #[test]
    fn duplicate_field_operator_pairs_survive() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Length);
        filters.add_condition(FieldName::Length);
        filters.update_condition(
            FieldName::Length,
            1,
            ConditionPatch {
                value: Some(FilterValue::Number(50.0)),
                ..Default::default()
            },
        );

        let pairs = filter_params(&filters);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "length__gte");
        assert_eq!(pairs[1].0, "length__gte");
        assert_ne!(pairs[0].1, pairs[1].1);
    }

    #[test]
    fn round_trip_recovers_enabled_triples() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Area);
        filters.update_condition(
            FieldName::Area,
            0,
            ConditionPatch {
                operator: Some(Operator::Gt),
                value: Some(FilterValue::Number(13.0)),
                ..Default::default()
            },
        );
        filters.add_filter(FieldName::SeverityIndex);

        let pairs = filter_params(&filters);
        let triples: Vec<(FieldName, Operator, String)> = pairs
            .iter()
            .map(|(key, value)| {
                let (field, operator) = parse_key(key).unwrap();
                (field, operator, value.clone())
            })
            .collect();

        assert_eq!(
            triples,
            vec![
                (FieldName::Area, Operator::Gt, "13".to_string()),
                (FieldName::SeverityIndex, Operator::Gte, "0".to_string()),
            ]
        );
    }

    #[test]
    fn ancillary_parameters_are_appended_verbatim() {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Length);

        let options = QueryOptions {
            fields: vec!["area", "length"],
            limit: Some(200),
            bins: Some(20),
            ..Default::default()
        };
        let qs = query_string(&filters, &options);
        assert_eq!(
            qs,
            "length__gte=0&fields=area&fields=length&limit=200&bins=20"
        );
    }

    #[test]
    fn query_string_encodes_values() {
        let filters = FiltersState::default();
        let options = QueryOptions {
            start: Some("2016-01-01T00:00:00+01:00".to_string()),
            ..Default::default()
        };
        let qs = query_string(&filters, &options);
        assert_eq!(qs, "start=2016-01-01T00%3A00%3A00%2B01%3A00");
    }

    #[test]
    fn parse_key_rejects_ancillary_keys() {
        assert!(parse_key("limit").is_none());
        assert!(parse_key("fields").is_none());
        assert!(parse_key("bogus__gte").is_none());
        assert!(parse_key("area__between").is_none());
    }
}
