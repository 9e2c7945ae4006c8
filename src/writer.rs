use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ImportResult;
use crate::normalize::JsonTable;
use crate::sql::SqlStatement;

/// Writes normalized tables to JSON Lines files, one per table
pub struct TableWriter {
    output_dir: PathBuf,
}

impl TableWriter {
    /// Create a writer for a directory, creating the directory if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> ImportResult<Self> {
        std::fs::create_dir_all(&output_dir)?;
        Ok(TableWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
        })
    }

    /// Write every table to `<table>.jsonl`, replacing existing files.
    /// Returns the written paths in table order.
    pub fn write_tables(&self, tables: &[JsonTable]) -> ImportResult<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(tables.len());
        for table in tables {
            let path = self.output_dir.join(format!("{}.jsonl", table.name));
            let mut writer = BufWriter::new(File::create(&path)?);
            for row in &table.rows {
                serde_json::to_writer(&mut writer, row).map_err(io::Error::from)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            tracing::debug!(table = %table.name, rows = table.rows.len(), path = %path.display(), "Wrote table");
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Writes a statement list as a SQL script or as JSON
pub struct ScriptWriter<W: Write> {
    writer: W,
}

impl<W: Write> ScriptWriter<W> {
    pub fn new(writer: W) -> Self {
        ScriptWriter { writer }
    }

    /// Each statement preceded by a comment with its sequence, type and description
    pub fn write_script(&mut self, statements: &[SqlStatement]) -> ImportResult<()> {
        for statement in statements {
            writeln!(
                self.writer,
                "-- [{}] {}: {}",
                statement.sequence, statement.statement_type, statement.description
            )?;
            writeln!(self.writer, "{}", statement.sql)?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    /// The statement list as a JSON array
    pub fn write_json(&mut self, statements: &[SqlStatement], pretty: bool) -> ImportResult<()> {
        let written = if pretty {
            serde_json::to_writer_pretty(&mut self.writer, statements)
        } else {
            serde_json::to_writer(&mut self.writer, statements)
        };
        written.map_err(io::Error::from)?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn flush(&mut self) -> ImportResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, NormalizationOptions};
    use crate::sql::StatementType;
    use serde_json::{json, Value};

    fn statement(sequence: usize, statement_type: StatementType, sql: &str) -> SqlStatement {
        SqlStatement {
            statement_type,
            sql: sql.to_string(),
            description: "Begin transaction".to_string(),
            sequence,
            table_name: None,
        }
    }

    #[test]
    fn test_script_writer() {
        let mut buffer = Vec::new();
        let mut writer = ScriptWriter::new(&mut buffer);
        writer
            .write_script(&[statement(1, StatementType::Begin, "BEGIN;")])
            .unwrap();
        writer.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "-- [1] BEGIN: Begin transaction\nBEGIN;\n\n");
    }

    #[test]
    fn test_json_writer() {
        let mut buffer = Vec::new();
        ScriptWriter::new(&mut buffer)
            .write_json(&[statement(1, StatementType::Commit, "COMMIT;")], false)
            .unwrap();

        let parsed: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed[0]["type"], json!("COMMIT"));
        assert_eq!(parsed[0]["sequence"], json!(1));
    }

    #[test]
    fn test_table_writer() {
        let dir = tempfile::tempdir().unwrap();
        let data = normalize(
            &json!({"user": {"name": "Ann", "tags": ["x", "y"]}}),
            "root",
            &NormalizationOptions::default(),
        )
        .unwrap();

        let writer = TableWriter::new(dir.path().join("tables")).unwrap();
        let paths = writer.write_tables(&data.tables).unwrap();
        assert_eq!(paths.len(), 2);

        let tags = std::fs::read_to_string(dir.path().join("tables/user_tags.jsonl")).unwrap();
        let lines: Vec<Value> = tags
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["value"], json!("x"));
        assert_eq!(lines[0]["_parent_id"], json!(1));
    }
}
