//! Resolved entity model: descriptors validated and flattened for runtime use.

use crate::config::{EntityConfig, ValidationRule};
use crate::error::ConfigError;
use std::collections::HashMap;

/// Primary key type for parsing path ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

impl PkType {
    fn from_pg(pg_type: &str) -> Self {
        match pg_type.to_lowercase().as_str() {
            "uuid" => PkType::Uuid,
            "bigint" | "bigserial" | "int8" => PkType::BigInt,
            "int" | "integer" | "serial" | "int4" => PkType::Int,
            _ => PkType::Text,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub pk_type: Option<PkType>,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. gen_random_uuid(), NOW()).
    pub has_default: bool,
    /// PostgreSQL type name used for parameter casts.
    pub pg_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub pk_columns: Vec<String>,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub operations: Vec<String>,
    pub public_operations: Vec<String>,
    pub validation: HashMap<String, ValidationRule>,
    pub create_overrides: HashMap<String, serde_json::Value>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: &str) -> bool {
        self.operations.iter().any(|o| o == op)
    }

    pub fn is_public(&self, op: &str) -> bool {
        self.public_operations.iter().any(|o| o == op)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}

/// Validate descriptors and build the runtime model.
pub fn resolve(configs: &[EntityConfig]) -> Result<ResolvedModel, ConfigError> {
    let mut model = ResolvedModel::default();
    for cfg in configs {
        let pks: Vec<_> = cfg.columns.iter().filter(|c| c.primary_key).collect();
        let [pk] = pks.as_slice() else {
            return Err(ConfigError::InvalidPrimaryKey { table: cfg.table.clone() });
        };
        let columns: Vec<ColumnInfo> = cfg
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                pk_type: c.primary_key.then(|| PkType::from_pg(&c.type_)),
                nullable: c.nullable,
                has_default: c.default.is_some(),
                pg_type: Some(c.type_.to_lowercase()),
            })
            .collect();
        for op in &cfg.api.public_operations {
            if !cfg.api.operations.contains(op) {
                return Err(ConfigError::Invalid {
                    var: "public_operations",
                    reason: format!("{} is public but not enabled on {}", op, cfg.table),
                });
            }
        }
        let entity = ResolvedEntity {
            schema_name: "public".into(),
            table_name: cfg.table.clone(),
            path_segment: cfg.api.path_segment.clone(),
            pk_columns: vec![pk.name.clone()],
            pk_type: PkType::from_pg(&pk.type_),
            columns,
            operations: cfg.api.operations.clone(),
            public_operations: cfg.api.public_operations.clone(),
            validation: cfg.api.validation.clone(),
            create_overrides: cfg.api.create_overrides.clone(),
        };
        if model.entity_by_path.contains_key(&entity.path_segment) {
            return Err(ConfigError::DuplicatePathSegment(entity.path_segment));
        }
        model.entity_by_path.insert(entity.path_segment.clone(), entity.clone());
        model.entities.push(entity);
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{entities::submission_entities, ApiEntityConfig, ColumnConfig};

    #[test]
    fn resolves_submission_entities() {
        let model = resolve(&submission_entities()).unwrap();
        let contacts = model.entity_by_path("contacts").unwrap();
        assert_eq!(contacts.pk_columns, vec!["id".to_string()]);
        assert_eq!(contacts.pk_type, PkType::Uuid);
        assert!(contacts.is_public("create"));
        assert!(!contacts.is_public("read"));
        assert!(model.entity_by_path("appointments").is_some());
    }

    #[test]
    fn rejects_duplicate_path_segments() {
        let mut configs = submission_entities();
        configs.push(configs[0].clone());
        assert!(matches!(resolve(&configs), Err(ConfigError::DuplicatePathSegment(_))));
    }

    #[test]
    fn rejects_table_without_single_primary_key() {
        let cfg = EntityConfig {
            table: "t".into(),
            columns: vec![ColumnConfig::new("a", "text")],
            api: ApiEntityConfig {
                path_segment: "t".into(),
                operations: vec!["read".into()],
                public_operations: vec![],
                validation: Default::default(),
                create_overrides: Default::default(),
            },
        };
        assert!(matches!(resolve(&[cfg]), Err(ConfigError::InvalidPrimaryKey { .. })));
    }
}
