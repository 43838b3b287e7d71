//! Statement builders
//!
//! Only four statement shapes reach the engine for records: create-if-absent,
//! insert-row, update-by-key and select. Identifiers are validated and quoted;
//! values always travel as bound parameters.

use crate::schema::{quote, validate_identifier, TableSchema};
use crate::value::{Key, Record, Value};
use crate::{Error, MismatchReason, Result};
use rusqlite::{params_from_iter, Connection};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }

    pub fn execute(&self, conn: &Connection) -> Result<usize> {
        Ok(conn.execute(&self.sql, params_from_iter(self.params.iter()))?)
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

fn placeholders(count: usize) -> String {
    (1..=count).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

/// `CREATE TABLE IF NOT EXISTS` with the key as primary key and every other
/// column `NOT NULL`.
pub fn create_table(schema: &TableSchema) -> Statement {
    let key = schema.key();
    let mut fields = vec![format!("{} {} PRIMARY KEY", quote(&key.name), key.ty)];
    fields.extend(
        schema
            .columns()
            .iter()
            .map(|c| format!("{} {} NOT NULL", quote(&c.name), c.ty)),
    );

    Statement::new(
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(schema.name()),
            fields.join(", ")
        ),
        Vec::new(),
    )
}

/// Insert one row. Values are ordered by the declared column order; every
/// declared column must be present in `record`.
pub fn insert(schema: &TableSchema, id: &Key, record: &Record) -> Result<Statement> {
    let id = id.checked()?;
    schema.check_record_columns(record.keys())?;

    let mut params = Vec::with_capacity(schema.columns().len() + 1);
    params.push(Value::from(id));
    for column in schema.columns() {
        let value = record
            .get(&column.name)
            .ok_or_else(|| Error::mismatch(schema.name(), &column.name, MismatchReason::Missing))?;
        params.push(value.clone());
    }

    let columns: Vec<String> = schema.column_names().map(quote).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(schema.name()),
        columns.join(", "),
        placeholders(params.len())
    );
    Ok(Statement::new(sql, params))
}

/// Update only the columns present in `partial`. `None` when there is
/// nothing to set.
pub fn update(schema: &TableSchema, id: &Key, partial: &Record) -> Result<Option<Statement>> {
    let id = id.checked()?;
    schema.check_record_columns(partial.keys())?;
    if partial.is_empty() {
        return Ok(None);
    }

    let mut params: Vec<Value> = Vec::with_capacity(partial.len() + 1);
    let mut assignments = Vec::with_capacity(partial.len());
    for (column, value) in partial {
        params.push(value.clone());
        assignments.push(format!("{} = ?{}", quote(column), params.len()));
    }
    params.push(Value::from(id));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote(schema.name()),
        assignments.join(", "),
        quote(&schema.key().name),
        params.len()
    );
    Ok(Some(Statement::new(sql, params)))
}

/// Fetch the value columns of one row by key.
pub fn select_one(schema: &TableSchema, id: &Key) -> Result<Statement> {
    let id = id.checked()?;
    let columns: Vec<String> = schema.columns().iter().map(|c| quote(&c.name)).collect();
    let projection = if columns.is_empty() {
        quote(&schema.key().name)
    } else {
        columns.join(", ")
    };

    Ok(Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            projection,
            quote(schema.name()),
            quote(&schema.key().name)
        ),
        vec![Value::from(id)],
    ))
}

/// Select every row of any table, registered or not.
pub fn select_all(table: &str) -> Result<Statement> {
    let table = validate_identifier(table)?;
    Ok(Statement::new(format!("SELECT * FROM {}", quote(table)), Vec::new()))
}

/// Name of the column declared as the table's primary key, as the engine
/// reports it.
pub fn primary_key_column(table: &str) -> Statement {
    Statement::new(
        "SELECT name FROM pragma_table_info(?1) WHERE pk = 1".to_string(),
        vec![Value::from(table)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn users() -> TableSchema {
        TableSchema::new(
            "users",
            Column::integer("id"),
            [Column::text("name"), Column::integer("score")],
        )
        .unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_create_sql() {
        let stmt = create_table(&users());
        assert_eq!(
            stmt.sql,
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" INTEGER PRIMARY KEY, "name" TEXT NOT NULL, "score" INTEGER NOT NULL)"#
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_insert_orders_by_declaration() {
        let rec = record(&[("score", Value::Integer(10)), ("name", Value::from("Ada"))]);
        let stmt = insert(&users(), &Key::from(1), &rec).unwrap();
        assert_eq!(
            stmt.sql,
            r#"INSERT INTO "users" ("id", "name", "score") VALUES (?1, ?2, ?3)"#
        );
        assert_eq!(
            stmt.params,
            vec![Value::Integer(1), Value::from("Ada"), Value::Integer(10)]
        );
    }

    #[test]
    fn test_insert_missing_column() {
        let rec = record(&[("name", Value::from("Ada"))]);
        let err = insert(&users(), &Key::from(1), &rec).unwrap_err();
        match err {
            Error::ColumnMismatch { column, reason, .. } => {
                assert_eq!(column, "score");
                assert_eq!(reason, MismatchReason::Missing);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_values_never_inlined() {
        let rec = record(&[("name", Value::from("x'); DROP TABLE users; --")), ("score", Value::Integer(1))]);
        let stmt = insert(&users(), &Key::from(1), &rec).unwrap();
        assert!(!stmt.sql.contains("DROP"));
    }

    #[test]
    fn test_partial_update() {
        let rec = record(&[("score", Value::Integer(15))]);
        let stmt = update(&users(), &Key::from(1), &rec).unwrap().unwrap();
        assert_eq!(stmt.sql, r#"UPDATE "users" SET "score" = ?1 WHERE "id" = ?2"#);
        assert_eq!(stmt.params, vec![Value::Integer(15), Value::Integer(1)]);

        assert!(update(&users(), &Key::from(1), &Record::new()).unwrap().is_none());
    }

    #[test]
    fn test_non_finite_key_never_bound() {
        let rec = record(&[("name", Value::from("Ada")), ("score", Value::Integer(1))]);
        let nan = Key::Real(f64::NAN);
        assert!(matches!(insert(&users(), &nan, &rec), Err(Error::InvalidValue(_))));
        assert!(matches!(update(&users(), &nan, &rec), Err(Error::InvalidValue(_))));
        assert!(matches!(
            select_one(&users(), &Key::Real(f64::NEG_INFINITY)),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_select_all_validates_name() {
        assert_eq!(select_all("users").unwrap().sql, r#"SELECT * FROM "users""#);
        assert!(select_all("users; --").is_err());
    }
}
