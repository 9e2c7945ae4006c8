use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of generated statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    Begin,
    CreateTable,
    CreateIndex,
    AlterTable,
    Insert,
    Commit,
}

impl StatementType {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementType::Begin => "BEGIN",
            StatementType::CreateTable => "CREATE_TABLE",
            StatementType::CreateIndex => "CREATE_INDEX",
            StatementType::AlterTable => "ALTER_TABLE",
            StatementType::Insert => "INSERT",
            StatementType::Commit => "COMMIT",
        }
    }

    /// Whether the statement changes the schema rather than the data
    pub fn is_ddl(self) -> bool {
        matches!(
            self,
            StatementType::CreateTable | StatementType::CreateIndex | StatementType::AlterTable
        )
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executable statement of an import script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlStatement {
    #[serde(rename = "type")]
    pub statement_type: StatementType,
    pub sql: String,
    pub description: String,
    /// Position in the script, starting at 1
    pub sequence: usize,
    /// Target table, for table-level statements
    pub table_name: Option<String>,
}

/// Collects statements and numbers them in emission order
#[derive(Debug, Default)]
pub(crate) struct StatementSink {
    statements: Vec<SqlStatement>,
}

impl StatementSink {
    pub fn push(
        &mut self,
        statement_type: StatementType,
        sql: String,
        description: String,
        table_name: Option<&str>,
    ) {
        let sequence = self.statements.len() + 1;
        self.statements.push(SqlStatement {
            statement_type,
            sql,
            description,
            sequence,
            table_name: table_name.map(str::to_string),
        });
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn into_statements(self) -> Vec<SqlStatement> {
        self.statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sink_numbers_statements() {
        let mut sink = StatementSink::default();
        sink.push(StatementType::Begin, "BEGIN;".into(), "Begin transaction".into(), None);
        sink.push(StatementType::Insert, "INSERT ...".into(), "Insert".into(), Some("users"));

        let statements = sink.into_statements();
        assert_eq!(statements[0].sequence, 1);
        assert_eq!(statements[1].sequence, 2);
        assert_eq!(statements[1].table_name.as_deref(), Some("users"));
    }

    #[test]
    fn test_statement_json_shape() {
        let statement = SqlStatement {
            statement_type: StatementType::CreateTable,
            sql: "CREATE TABLE ...".to_string(),
            description: "Create table users".to_string(),
            sequence: 2,
            table_name: Some("users".to_string()),
        };
        let value = serde_json::to_value(&statement).unwrap();
        assert_eq!(value["type"], json!("CREATE_TABLE"));
        assert_eq!(value["tableName"], json!("users"));
        assert!(StatementType::AlterTable.is_ddl());
        assert!(!StatementType::Insert.is_ddl());
    }
}
