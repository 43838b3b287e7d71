use crate::schema::TableSchema;
use crate::value::{Record, Snapshot, Value};
use std::collections::BTreeSet;
use tabled::{builder::Builder, settings::Style};

/// Render a snapshot with one row per key. Columns are the union of record
/// columns, sorted; cells absent from a record are left blank.
pub fn snapshot_table(key_label: &str, snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return String::new();
    }

    let columns: BTreeSet<&str> = snapshot
        .values()
        .flat_map(|record: &Record| record.keys().map(String::as_str))
        .collect();

    let mut builder = Builder::default();
    builder.push_record(std::iter::once(key_label.to_string()).chain(columns.iter().map(|c| c.to_string())));
    for (key, record) in snapshot {
        let cells = columns
            .iter()
            .map(|column| record.get(*column).map(cell).unwrap_or_default());
        builder.push_record(std::iter::once(key.to_string()).chain(cells));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Render a declared table as `column | type | role` rows.
pub fn schema_table(schema: &TableSchema) -> String {
    let mut builder = Builder::default();
    builder.push_record(row(["Column", "Type", "Role"]));

    let key = schema.key();
    builder.push_record(row([key.name.as_str(), key.ty.as_str(), "primary key"]));
    for column in schema.columns() {
        builder.push_record(row([column.name.as_str(), column.ty.as_str(), "not null"]));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn row<const N: usize>(cells: [&str; N]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "∅".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use crate::value::Key;

    #[test]
    fn test_snapshot_table_rows() {
        let mut snapshot = Snapshot::new();
        let mut ada = Record::new();
        ada.insert("name".to_string(), Value::from("Ada"));
        ada.insert("score".to_string(), Value::Integer(15));
        snapshot.insert(Key::from(1), ada);

        let rendered = snapshot_table("id", &snapshot);
        assert!(rendered.contains("id"));
        assert!(rendered.contains("Ada"));
        assert!(rendered.contains("15"));
        assert!(snapshot_table("id", &Snapshot::new()).is_empty());
    }

    #[test]
    fn test_schema_table() {
        let schema = TableSchema::new("users", Column::integer("id"), [Column::text("name")]).unwrap();
        let rendered = schema_table(&schema);
        assert!(rendered.contains("primary key"));
        assert!(rendered.contains("TEXT"));
    }
}
