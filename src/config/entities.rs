//! Contact, help request, appointment and phone submissions: public create, admin management.

use crate::config::{ApiEntityConfig, ColumnConfig, EntityConfig, ValidationRule};
use serde_json::Value;
use std::collections::HashMap;

const PHONE_PATTERN: &str = r"^\+?[0-9 ()\-]{6,20}$";

fn all_operations() -> Vec<String> {
    ["create", "read", "update", "delete"].iter().map(|s| s.to_string()).collect()
}

fn id_and_timestamps(mut columns: Vec<ColumnConfig>) -> Vec<ColumnConfig> {
    let mut out = vec![ColumnConfig::new("id", "uuid").primary_key().default_expr("gen_random_uuid()")];
    out.append(&mut columns);
    out.push(ColumnConfig::new("created_at", "timestamptz").not_null().default_expr("NOW()"));
    out.push(ColumnConfig::new("updated_at", "timestamptz").not_null().default_expr("NOW()"));
    out
}

fn submission(
    table: &str,
    columns: Vec<ColumnConfig>,
    validation: Vec<(&str, ValidationRule)>,
    initial_status: &str,
) -> EntityConfig {
    let mut create_overrides = HashMap::new();
    create_overrides.insert("status".to_string(), Value::String(initial_status.into()));
    EntityConfig {
        table: table.into(),
        columns: id_and_timestamps(columns),
        api: ApiEntityConfig {
            path_segment: table.replace('_', "-"),
            operations: all_operations(),
            public_operations: vec!["create".into()],
            validation: validation.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            create_overrides,
        },
    }
}

fn contacts() -> EntityConfig {
    let statuses = ["new", "read", "resolved"];
    submission(
        "contacts",
        vec![
            ColumnConfig::new("name", "text").not_null(),
            ColumnConfig::new("email", "text").not_null(),
            ColumnConfig::new("phone", "text"),
            ColumnConfig::new("subject", "text"),
            ColumnConfig::new("message", "text").not_null(),
            ColumnConfig::new("status", "text").not_null().default_expr("'new'"),
        ],
        vec![
            ("name", ValidationRule::required().max_length(120)),
            ("email", ValidationRule::required().format("email").max_length(254)),
            ("phone", ValidationRule::default().pattern(PHONE_PATTERN)),
            ("subject", ValidationRule::default().max_length(200)),
            ("message", ValidationRule::required().max_length(5000)),
            ("status", ValidationRule::default().allowed(&statuses)),
        ],
        "new",
    )
}

fn help_requests() -> EntityConfig {
    submission(
        "help_requests",
        vec![
            ColumnConfig::new("name", "text"),
            ColumnConfig::new("email", "text").not_null(),
            ColumnConfig::new("phone", "text"),
            ColumnConfig::new("store_id", "uuid").references("stores(id) ON DELETE SET NULL"),
            ColumnConfig::new("subject", "text").not_null(),
            ColumnConfig::new("description", "text").not_null(),
            ColumnConfig::new("priority", "text").not_null().default_expr("'normal'"),
            ColumnConfig::new("status", "text").not_null().default_expr("'open'"),
        ],
        vec![
            ("name", ValidationRule::default().max_length(120)),
            ("email", ValidationRule::required().format("email").max_length(254)),
            ("phone", ValidationRule::default().pattern(PHONE_PATTERN)),
            ("store_id", ValidationRule::default().format("uuid")),
            ("subject", ValidationRule::required().max_length(200)),
            ("description", ValidationRule::required().max_length(5000)),
            ("priority", ValidationRule::default().allowed(&["low", "normal", "high"])),
            ("status", ValidationRule::default().allowed(&["open", "in_progress", "resolved", "closed"])),
        ],
        "open",
    )
}

fn appointments() -> EntityConfig {
    submission(
        "appointments",
        vec![
            ColumnConfig::new("name", "text").not_null(),
            ColumnConfig::new("email", "text").not_null(),
            ColumnConfig::new("phone", "text").not_null(),
            ColumnConfig::new("preferred_date", "timestamptz").not_null(),
            ColumnConfig::new("purpose", "text"),
            ColumnConfig::new("notes", "text"),
            ColumnConfig::new("status", "text").not_null().default_expr("'pending'"),
        ],
        vec![
            ("name", ValidationRule::required().max_length(120)),
            ("email", ValidationRule::required().format("email").max_length(254)),
            ("phone", ValidationRule::required().pattern(PHONE_PATTERN)),
            ("preferred_date", ValidationRule::required().format("datetime")),
            ("purpose", ValidationRule::default().max_length(200)),
            ("notes", ValidationRule::default().max_length(2000)),
            ("status", ValidationRule::default().allowed(&["pending", "confirmed", "cancelled", "completed"])),
        ],
        "pending",
    )
}

fn phone_submissions() -> EntityConfig {
    submission(
        "phone_submissions",
        vec![
            ColumnConfig::new("phone", "text").not_null(),
            ColumnConfig::new("name", "text"),
            ColumnConfig::new("source", "text"),
            ColumnConfig::new("status", "text").not_null().default_expr("'new'"),
        ],
        vec![
            ("phone", ValidationRule::required().pattern(PHONE_PATTERN)),
            ("name", ValidationRule::default().max_length(120)),
            ("source", ValidationRule::default().max_length(100)),
            ("status", ValidationRule::default().allowed(&["new", "contacted"])),
        ],
        "new",
    )
}

/// Descriptors for every table served by the generic entity routes.
pub fn submission_entities() -> Vec<EntityConfig> {
    vec![contacts(), help_requests(), appointments(), phone_submissions()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_kebab_case() {
        let segments: Vec<_> = submission_entities().into_iter().map(|e| e.api.path_segment).collect();
        assert_eq!(segments, vec!["contacts", "help-requests", "appointments", "phone-submissions"]);
    }

    #[test]
    fn every_validated_column_exists() {
        for e in submission_entities() {
            for col in e.api.validation.keys() {
                assert!(e.columns.iter().any(|c| &c.name == col), "{} missing on {}", col, e.table);
            }
        }
    }
}
