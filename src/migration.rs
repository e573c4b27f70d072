//! DDL for descriptor-driven tables: one `CREATE TABLE IF NOT EXISTS` per entity.

use crate::config::types::EntityConfig;
use crate::error::{AppError, ConfigError};
use sqlx::PgPool;

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` statement for one descriptor.
pub fn create_table_sql(entity: &EntityConfig) -> Result<String, ConfigError> {
    let pk: Vec<&str> = entity
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    if pk.len() != 1 {
        return Err(ConfigError::InvalidPrimaryKey {
            table: entity.table.clone(),
        });
    }

    let mut defs: Vec<String> = Vec::with_capacity(entity.columns.len() + 1);
    for c in &entity.columns {
        let mut def = format!("{} {}", quote(&c.name), c.type_.to_uppercase());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(ref d) = c.default {
            def.push_str(" DEFAULT ");
            def.push_str(d);
        }
        if let Some(ref r) = c.references {
            def.push_str(" REFERENCES ");
            def.push_str(r);
        }
        defs.push(def);
    }
    defs.push(format!("PRIMARY KEY ({})", quote(pk[0])));

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quote(&entity.table),
        defs.join(",\n  ")
    ))
}

/// Creates every descriptor table that does not exist yet. Referenced tables must already exist.
pub async fn apply_entity_tables(pool: &PgPool, entities: &[EntityConfig]) -> Result<(), AppError> {
    for e in entities {
        let sql = create_table_sql(e)?;
        sqlx::query(&sql).execute(pool).await?;
        tracing::debug!(table = %e.table, "ensured table");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::entities::submission_entities;
    use crate::config::{ApiEntityConfig, ColumnConfig};

    #[test]
    fn generates_columns_defaults_and_references() {
        let help = submission_entities()
            .into_iter()
            .find(|e| e.table == "help_requests")
            .unwrap();
        let sql = create_table_sql(&help).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"help_requests\""));
        assert!(sql.contains("\"id\" UUID NOT NULL DEFAULT gen_random_uuid()"));
        assert!(sql.contains("\"store_id\" UUID REFERENCES stores(id) ON DELETE SET NULL"));
        assert!(sql.contains("\"status\" TEXT NOT NULL DEFAULT 'open'"));
        assert!(sql.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn requires_single_primary_key() {
        let e = EntityConfig {
            table: "t".into(),
            columns: vec![ColumnConfig::new("a", "text")],
            api: ApiEntityConfig {
                path_segment: "t".into(),
                operations: vec![],
                public_operations: vec![],
                validation: Default::default(),
                create_overrides: Default::default(),
            },
        };
        assert!(matches!(create_table_sql(&e), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }
}
