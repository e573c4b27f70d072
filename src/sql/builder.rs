//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::config::{ColumnInfo, ResolvedEntity};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from descriptors).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its placeholder, cast to the column type when known.
    fn push_param(&mut self, v: Value, column: Option<&ColumnInfo>) -> String {
        self.params.push(v);
        let n = self.params.len();
        match column.and_then(|c| c.pg_type.as_deref()) {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

/// SELECT list: numeric as text so rows decode without a decimal mapping.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if c.pg_type.as_deref() == Some("numeric") {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn pk_column(entity: &ResolvedEntity) -> Option<&ColumnInfo> {
    entity.column(&entity.pk_columns[0])
}

fn where_filters(q: &mut QueryBuf, entity: &ResolvedEntity, filters: &[(String, Value)]) -> String {
    let mut parts = Vec::new();
    for (col, val) in filters {
        let Some(info) = entity.column(col) else { continue };
        let ph = q.push_param(val.clone(), Some(info));
        parts.push(format!("{} = {}", quoted(col), ph));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key (single column PK only).
pub fn select_by_id(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), pk_column(entity));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&entity.pk_columns[0]),
        ph
    );
    q
}

/// SELECT page with exact-match filters, newest first.
pub fn select_list(entity: &ResolvedEntity, filters: &[(String, Value)], limit: i64, offset: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_filters(&mut q, entity, filters);
    let order = if entity.has_column("created_at") {
        format!("{} DESC, {}", quoted("created_at"), quoted(&entity.pk_columns[0]))
    } else {
        quoted(&entity.pk_columns[0])
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        order,
        limit.max(0),
        offset.max(0)
    );
    q
}

/// COUNT(*) with the same filters as [`select_list`].
pub fn select_count(entity: &ResolvedEntity, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_filters(&mut q, entity, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(entity), where_clause);
    q
}

/// INSERT: PK and timestamp columns are left to their defaults; other defaulted columns only when the body omits them.
pub fn insert(entity: &ResolvedEntity, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if c.pk_type.is_some() || c.name == "created_at" || c.name == "updated_at" {
            continue;
        }
        let val = body.get(&c.name).cloned();
        if val.is_none() && c.has_default {
            continue;
        }
        placeholders.push(q.push_param(val.unwrap_or(Value::Null), Some(c)));
        cols.push(quoted(&c.name));
    }
    let table = qualified_table(entity);
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only columns present in the body; a JSON null clears the column.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = &entity.pk_columns[0];
    let mut sets = Vec::new();
    for c in &entity.columns {
        if c.name == *pk || c.name == "created_at" || c.name == "updated_at" {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        let ph = q.push_param(v.clone(), Some(c));
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    if entity.has_column("updated_at") {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_ph = q.push_param(id.clone(), pk_column(entity));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        quoted(pk),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.clone(), pk_column(entity));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        quoted(&entity.pk_columns[0]),
        ph,
        select_column_list(entity)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{entities::submission_entities, resolve};
    use serde_json::json;

    fn contacts() -> ResolvedEntity {
        resolve(&submission_entities()).unwrap().entity_by_path("contacts").unwrap().clone()
    }

    #[test]
    fn insert_skips_generated_columns_and_casts_params() {
        let body = json!({"name": "Ann", "email": "a@b.co", "message": "hi"});
        let q = insert(&contacts(), body.as_object().unwrap());
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"contacts\" (\"name\", \"email\", \"phone\", \"subject\", \"message\")"));
        assert!(q.sql.contains("$1::text"));
        assert_eq!(q.params.len(), 5);
        assert_eq!(q.params[2], Value::Null);
    }

    #[test]
    fn update_sets_only_present_columns() {
        let body = json!({"status": "read", "phone": null});
        let q = update(&contacts(), &json!("00000000-0000-0000-0000-000000000001"), body.as_object().unwrap());
        assert!(q.sql.contains("\"phone\" = $1::text"));
        assert!(q.sql.contains("\"status\" = $2::text"));
        assert!(q.sql.contains("\"updated_at\" = NOW()"));
        assert!(q.sql.contains("WHERE \"id\" = $3::uuid"));
        assert!(!q.sql.contains("\"name\" ="));
    }

    #[test]
    fn list_and_count_share_filters() {
        let filters = vec![("status".to_string(), json!("new")), ("bogus".to_string(), json!(1))];
        let list = select_list(&contacts(), &filters, 10, 20);
        let count = select_count(&contacts(), &filters);
        assert!(list.sql.contains("WHERE \"status\" = $1::text"));
        assert!(list.sql.ends_with("LIMIT 10 OFFSET 20"));
        assert_eq!(count.sql, "SELECT COUNT(*) FROM \"public\".\"contacts\" WHERE \"status\" = $1::text");
        assert_eq!(count.params.len(), 1);
    }
}
