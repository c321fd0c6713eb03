//! Table rows for `projects` and `tasks`, with row-ownership checks applied
//! to every read and write.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use taskdeck_service::{SortOrder, TableQuery};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Projects,
    Tasks,
}

impl Table {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "projects" => Some(Table::Projects),
            "tasks" => Some(Table::Tasks),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Table::Projects => "projects",
            Table::Tasks => "tasks",
        }
    }

    fn columns(&self) -> &'static [ColumnDef] {
        match self {
            Table::Projects => PROJECT_COLUMNS,
            Table::Tasks => TASK_COLUMNS,
        }
    }

    fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns().iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Bool,
}

struct ColumnDef {
    name: &'static str,
    kind: ColumnKind,
    nullable: bool,
    /// Filled by the store when omitted from an insert.
    generated: bool,
}

const PROJECT_COLUMNS: &[ColumnDef] = &[
    ColumnDef { name: "id", kind: ColumnKind::Text, nullable: false, generated: true },
    ColumnDef { name: "title", kind: ColumnKind::Text, nullable: false, generated: false },
    ColumnDef { name: "description", kind: ColumnKind::Text, nullable: true, generated: false },
    ColumnDef { name: "user_id", kind: ColumnKind::Text, nullable: false, generated: false },
    ColumnDef { name: "created_at", kind: ColumnKind::Text, nullable: false, generated: true },
];

const TASK_COLUMNS: &[ColumnDef] = &[
    ColumnDef { name: "id", kind: ColumnKind::Text, nullable: false, generated: true },
    ColumnDef { name: "title", kind: ColumnKind::Text, nullable: false, generated: false },
    ColumnDef { name: "completed", kind: ColumnKind::Bool, nullable: false, generated: true },
    ColumnDef { name: "project_id", kind: ColumnKind::Text, nullable: false, generated: false },
    ColumnDef { name: "created_at", kind: ColumnKind::Text, nullable: false, generated: true },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("relation \"public.{0}\" does not exist")]
    UnknownTable(String),
    #[error("Could not find the '{column}' column of '{table}' in the schema cache")]
    UnknownColumn { table: &'static str, column: String },
    #[error("null value in column \"{column}\" of relation \"{table}\" violates not-null constraint")]
    NotNull { table: &'static str, column: &'static str },
    #[error("invalid input for column \"{column}\": {value}")]
    InvalidValue { column: &'static str, value: String },
    #[error("new row violates row-level security policy for table \"{0}\"")]
    RowSecurity(&'static str),
}

impl StoreError {
    /// PostgREST / Postgres error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UnknownTable(_) => "42P01",
            StoreError::UnknownColumn { .. } => "PGRST204",
            StoreError::NotNull { .. } => "23502",
            StoreError::InvalidValue { .. } => "22P02",
            StoreError::RowSecurity(_) => "42501",
        }
    }
}

#[derive(Default)]
pub struct TableStore {
    projects: Vec<Row>,
    tasks: Vec<Row>,
    last_created: Option<DateTime<Utc>>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of `query.table()` visible to `user`, filtered, ordered and limited.
    /// Anonymous callers see nothing.
    pub fn select(&self, user: Option<&str>, query: &TableQuery) -> Result<Vec<Row>, StoreError> {
        let table = resolve(query.table())?;
        for (column, _) in query.filters() {
            check_column(table, column)?;
        }
        if let Some((column, _)) = query.ordering() {
            check_column(table, column)?;
        }

        let mut rows: Vec<Row> = self
            .rows(table)
            .iter()
            .filter(|row| self.visible(user, table, row))
            .filter(|row| matches_filters(row, query.filters()))
            .cloned()
            .collect();

        if let Some((column, order)) = query.ordering() {
            // Stable, so ties keep insertion order.
            rows.sort_by(|a, b| {
                let (a, b) = (cell_text(a.get(column)), cell_text(b.get(column)));
                match order {
                    SortOrder::Asc => a.cmp(&b),
                    SortOrder::Desc => b.cmp(&a),
                }
            });
        }
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Insert rows, filling generated columns. All rows are validated before any is stored.
    pub fn insert(
        &mut self,
        user: Option<&str>,
        table: &str,
        rows: Vec<Row>,
    ) -> Result<Vec<Row>, StoreError> {
        let table = resolve(table)?;
        let mut prepared = Vec::with_capacity(rows.len());
        for body in rows {
            let mut row = Row::new();
            for (column, value) in body {
                let def = check_column(table, &column)?;
                check_value(def, &value)?;
                row.insert(column, value);
            }
            for def in table.columns() {
                if row.get(def.name).is_some_and(|v| !v.is_null()) {
                    continue;
                }
                match (def.generated, def.nullable) {
                    (true, _) => {
                        let value = self.generate(def.name);
                        row.insert(def.name.to_string(), value);
                    }
                    (false, true) => {
                        row.insert(def.name.to_string(), Value::Null);
                    }
                    (false, false) => {
                        return Err(StoreError::NotNull {
                            table: table.name(),
                            column: def.name,
                        })
                    }
                }
            }
            if !self.visible(user, table, &row) {
                return Err(StoreError::RowSecurity(table.name()));
            }
            prepared.push(row);
        }

        self.rows_mut(table).extend(prepared.iter().cloned());
        tracing::debug!(table = table.name(), count = prepared.len(), "rows inserted");
        Ok(prepared)
    }

    /// Apply `patch` to every visible row matching the query's filters.
    /// Returns the updated rows; zero matches is not an error.
    pub fn update(
        &mut self,
        user: Option<&str>,
        query: &TableQuery,
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        let table = resolve(query.table())?;
        for (column, _) in query.filters() {
            check_column(table, column)?;
        }
        for (column, value) in &patch {
            let def = check_column(table, column)?;
            if !def.nullable && value.is_null() {
                return Err(StoreError::NotNull {
                    table: table.name(),
                    column: def.name,
                });
            }
            check_value(def, value)?;
        }

        let targets: Vec<usize> = self
            .rows(table)
            .iter()
            .enumerate()
            .filter(|(_, row)| self.visible(user, table, row))
            .filter(|(_, row)| matches_filters(row, query.filters()))
            .map(|(i, _)| i)
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for &i in &targets {
            let mut row = self.rows(table)[i].clone();
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            if !self.visible(user, table, &row) {
                return Err(StoreError::RowSecurity(table.name()));
            }
            updated.push(row);
        }
        for (&i, row) in targets.iter().zip(&updated) {
            self.rows_mut(table)[i] = row.clone();
        }
        Ok(updated)
    }

    fn rows(&self, table: Table) -> &Vec<Row> {
        match table {
            Table::Projects => &self.projects,
            Table::Tasks => &self.tasks,
        }
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
        match table {
            Table::Projects => &mut self.projects,
            Table::Tasks => &mut self.tasks,
        }
    }

    /// A project belongs to its `user_id`; a task belongs to whoever owns its project.
    fn visible(&self, user: Option<&str>, table: Table, row: &Row) -> bool {
        let Some(user) = user else {
            return false;
        };
        match table {
            Table::Projects => row.get("user_id").and_then(Value::as_str) == Some(user),
            Table::Tasks => {
                let Some(project_id) = row.get("project_id").and_then(Value::as_str) else {
                    return false;
                };
                self.projects.iter().any(|p| {
                    p.get("id").and_then(Value::as_str) == Some(project_id)
                        && p.get("user_id").and_then(Value::as_str) == Some(user)
                })
            }
        }
    }

    fn generate(&mut self, column: &str) -> Value {
        match column {
            "id" => Value::String(uuid::Uuid::new_v4().to_string()),
            "created_at" => Value::String(self.next_created_at()),
            "completed" => Value::Bool(false),
            _ => Value::Null,
        }
    }

    /// Strictly increasing timestamps, so newest-first ordering never ties.
    fn next_created_at(&mut self) -> String {
        let now = Utc::now();
        let stamp = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(stamp);
        stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

fn resolve(name: &str) -> Result<Table, StoreError> {
    Table::from_name(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))
}

fn check_column(table: Table, column: &str) -> Result<&'static ColumnDef, StoreError> {
    table.column(column).ok_or_else(|| StoreError::UnknownColumn {
        table: table.name(),
        column: column.to_string(),
    })
}

fn check_value(def: &ColumnDef, value: &Value) -> Result<(), StoreError> {
    let ok = match (def.kind, value) {
        (_, Value::Null) => true,
        (ColumnKind::Text, Value::String(_)) => true,
        (ColumnKind::Bool, Value::Bool(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidValue {
            column: def.name,
            value: value.to_string(),
        })
    }
}

fn matches_filters(row: &Row, filters: &[(String, String)]) -> bool {
    filters
        .iter()
        .all(|(column, expected)| cell_text(row.get(column)) == *expected)
}

/// The text form a filter value is compared against.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn project(store: &mut TableStore, user: &str, title: &str) -> Row {
        store
            .insert(
                Some(user),
                "projects",
                vec![row(json!({ "title": title, "user_id": user }))],
            )
            .unwrap()
            .remove(0)
    }

    fn id(row: &Row) -> String {
        row["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn insert_fills_defaults() {
        let mut store = TableStore::new();
        let p = project(&mut store, "u1", "Trip");
        assert!(p["description"].is_null());
        assert!(uuid::Uuid::parse_str(p["id"].as_str().unwrap()).is_ok());

        let t = store
            .insert(
                Some("u1"),
                "tasks",
                vec![row(json!({ "title": "Pack", "project_id": id(&p) }))],
            )
            .unwrap()
            .remove(0);
        assert_eq!(t["completed"], json!(false));
    }

    #[test]
    fn created_at_is_strictly_increasing() {
        let mut store = TableStore::new();
        let stamps: Vec<String> = (0..50)
            .map(|i| project(&mut store, "u1", &format!("p{i}"))["created_at"]
                .as_str()
                .unwrap()
                .to_string())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn select_orders_newest_first_and_limits() {
        let mut store = TableStore::new();
        project(&mut store, "u1", "first");
        project(&mut store, "u1", "second");
        project(&mut store, "u1", "third");

        let query = TableQuery::from("projects")
            .eq("user_id", "u1")
            .order_desc("created_at")
            .limit(2);
        let titles: Vec<_> = store
            .select(Some("u1"), &query)
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["third", "second"]);
    }

    #[test]
    fn rows_of_other_users_are_invisible() {
        let mut store = TableStore::new();
        let p = project(&mut store, "u1", "Mine");
        store
            .insert(
                Some("u1"),
                "tasks",
                vec![row(json!({ "title": "t", "project_id": id(&p) }))],
            )
            .unwrap();

        assert!(store
            .select(Some("u2"), &TableQuery::from("projects"))
            .unwrap()
            .is_empty());
        assert!(store
            .select(Some("u2"), &TableQuery::from("tasks"))
            .unwrap()
            .is_empty());
        assert!(store
            .select(None, &TableQuery::from("projects"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn insert_for_another_owner_is_rejected() {
        let mut store = TableStore::new();
        let err = store
            .insert(
                Some("u2"),
                "projects",
                vec![row(json!({ "title": "x", "user_id": "u1" }))],
            )
            .unwrap_err();
        assert_eq!(err, StoreError::RowSecurity("projects"));

        let p = project(&mut store, "u1", "Mine");
        let err = store
            .insert(
                Some("u2"),
                "tasks",
                vec![row(json!({ "title": "t", "project_id": id(&p) }))],
            )
            .unwrap_err();
        assert_eq!(err.code(), "42501");
    }

    #[test]
    fn insert_validates_columns_and_types() {
        let mut store = TableStore::new();
        let err = store
            .insert(
                Some("u1"),
                "projects",
                vec![row(json!({ "title": "x", "user_id": "u1", "color": "red" }))],
            )
            .unwrap_err();
        assert_eq!(err.code(), "PGRST204");

        let err = store
            .insert(Some("u1"), "projects", vec![row(json!({ "user_id": "u1" }))])
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotNull {
                table: "projects",
                column: "title"
            }
        );

        let err = store
            .insert(
                Some("u1"),
                "projects",
                vec![row(json!({ "title": 5, "user_id": "u1" }))],
            )
            .unwrap_err();
        assert_eq!(err.code(), "22P02");

        let err = store.insert(Some("u1"), "people", vec![]).unwrap_err();
        assert_eq!(err, StoreError::UnknownTable("people".into()));
    }

    #[test]
    fn update_touches_only_visible_matches() {
        let mut store = TableStore::new();
        let p = project(&mut store, "u1", "Mine");
        let t = store
            .insert(
                Some("u1"),
                "tasks",
                vec![row(json!({ "title": "t", "project_id": id(&p) }))],
            )
            .unwrap()
            .remove(0);

        let query = TableQuery::from("tasks").eq("id", id(&t));
        let patch = row(json!({ "completed": true }));

        assert!(store.update(Some("u2"), &query, patch.clone()).unwrap().is_empty());
        let updated = store.update(Some("u1"), &query, patch).unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["completed"], json!(true));

        let filtered = TableQuery::from("tasks").eq("completed", "true");
        assert_eq!(store.select(Some("u1"), &filtered).unwrap().len(), 1);
    }

    #[test]
    fn update_cannot_move_a_row_out_of_reach() {
        let mut store = TableStore::new();
        let p = project(&mut store, "u1", "Mine");
        let query = TableQuery::from("projects").eq("id", id(&p));
        let err = store
            .update(Some("u1"), &query, row(json!({ "user_id": "u2" })))
            .unwrap_err();
        assert_eq!(err, StoreError::RowSecurity("projects"));
    }
}
