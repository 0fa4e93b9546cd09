//! Well-known label keys that the core itself interprets. Everything else a
//! task carries is opaque and passed through untouched.

use typedmap::TypedKey;

/// Marks a task as user-togglable feature; gates `selectFeatures`/`subset`.
pub fn feature_flag() -> TypedKey<bool> {
    TypedKey::new("inspection.feature-flag")
}

pub fn feature_title() -> TypedKey<String> {
    TypedKey::new("inspection.feature.title")
}

pub fn feature_description() -> TypedKey<String> {
    TypedKey::new("inspection.feature.description")
}

/// The log type a feature task targets, e.g. `"audit"`. Defaults to
/// `"unknown"` when absent.
pub fn feature_target_log_type() -> TypedKey<String> {
    TypedKey::new("inspection.feature.target-log-type")
}

/// Inspection-type ids a feature task applies to.
pub fn inspection_types() -> TypedKey<Vec<String>> {
    TypedKey::new("inspection.types")
}

pub fn task_is_query() -> TypedKey<bool> {
    TypedKey::new("task.is-query")
}

pub fn task_query_target_log_type() -> TypedKey<String> {
    TypedKey::new("task.query.target-log-type")
}

pub fn task_query_sample_query() -> TypedKey<String> {
    TypedKey::new("task.query.sample-query")
}

pub fn task_is_form() -> TypedKey<bool> {
    TypedKey::new("task.is-form")
}

pub fn task_form_field_label() -> TypedKey<String> {
    TypedKey::new("task.form.field-label")
}

pub fn task_form_field_description() -> TypedKey<String> {
    TypedKey::new("task.form.field-description")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_identifiers() {
        assert_eq!(feature_flag().id(), "inspection.feature-flag");
        assert_eq!(task_is_query().id(), "task.is-query");
    }
}
