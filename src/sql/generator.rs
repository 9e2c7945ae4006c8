//! Turn normalized tables and their match results into an ordered SQL script

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::batch::calculate_batch_size;
use super::format::{format_value, qualified_name, quote_identifier};
use super::ids::IdRemapper;
use super::statement::{SqlStatement, StatementSink, StatementType};
use crate::infer::{attempt_cast, patterns, CastOutcome, CastingRule, ColumnType};
use crate::matcher::{
    types_compatible, ConflictResolution, ExistingTableSchema, ImportStatus, TableMatchResult,
    TableOverride,
};
use crate::normalize::{
    ForeignKeyRelationship, JsonTable, Row, IDENTITY_COLUMN, MAX_IDENTIFIER_LENGTH,
    PARENT_ID_COLUMN,
};

/// Primary key column of created tables
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// Generation switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    /// Emit `BEGIN;` first and `COMMIT;` last
    pub wrap_in_transaction: bool,
    /// Emit `CREATE INDEX` for suggested columns of created tables
    pub create_indexes: bool,
    /// Write NULL when a `cast` conflict value cannot be converted
    pub null_on_cast_failure: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            wrap_in_transaction: true,
            create_indexes: false,
            null_on_cast_failure: false,
        }
    }
}

/// Everything the generator reads
#[derive(Debug, Clone, Copy)]
pub struct ImportContext<'a> {
    pub tables: &'a [JsonTable],
    pub relationships: &'a [ForeignKeyRelationship],
    /// Match results by import table; tables without one are created
    pub matches: &'a [TableMatchResult],
    pub existing_schemas: &'a [ExistingTableSchema],
    /// Target database schema
    pub schema: &'a str,
    /// Row indices to import per table; tables without an entry import every row
    pub selected_rows: Option<&'a HashMap<String, Vec<usize>>>,
    /// Reviewer decisions per import table
    pub overrides: Option<&'a HashMap<String, TableOverride>>,
}

impl<'a> ImportContext<'a> {
    pub fn new(
        tables: &'a [JsonTable],
        relationships: &'a [ForeignKeyRelationship],
        schema: &'a str,
    ) -> Self {
        ImportContext {
            tables,
            relationships,
            matches: &[],
            existing_schemas: &[],
            schema,
            selected_rows: None,
            overrides: None,
        }
    }

    pub fn with_matches(
        mut self,
        matches: &'a [TableMatchResult],
        existing_schemas: &'a [ExistingTableSchema],
    ) -> Self {
        self.matches = matches;
        self.existing_schemas = existing_schemas;
        self
    }

    pub fn with_selected_rows(mut self, selected_rows: &'a HashMap<String, Vec<usize>>) -> Self {
        self.selected_rows = Some(selected_rows);
        self
    }

    pub fn with_overrides(mut self, overrides: &'a HashMap<String, TableOverride>) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// Where an inserted column's values come from
#[derive(Debug, Clone)]
enum ColumnSource {
    /// The row's final id
    Identity,
    /// The parent row's final id
    Parent,
    /// A data column of the import table
    Data {
        name: String,
        cast: Option<CastingRule>,
    },
}

#[derive(Debug, Clone)]
struct InsertColumn {
    target: String,
    source: ColumnSource,
    column_type: Option<ColumnType>,
}

/// Per-table decisions, resolved before any statement is emitted
struct TablePlan<'a> {
    table: &'a JsonTable,
    result: TableMatchResult,
    /// Table written to, in the target schema
    target: String,
    existing: Option<&'a ExistingTableSchema>,
    /// Import name of the parent table
    parent: Option<&'a str>,
    depth: usize,
}

impl TablePlan<'_> {
    fn status(&self) -> ImportStatus {
        self.result.status
    }
}

/// Generate the statements that import `ctx.tables` into the target schema.
///
/// Schema changes come first, parents before children, followed by the
/// INSERTs in the same order. Sequence numbers are continuous from 1.
pub fn generate_smart_import_sql(
    ctx: &ImportContext<'_>,
    options: &GeneratorOptions,
) -> Vec<SqlStatement> {
    let plans = plan_tables(ctx);

    let mut remapper = IdRemapper::new();
    for plan in &plans {
        remapper.remap_table(plan.table);
    }

    let targets: HashMap<&str, &TablePlan<'_>> =
        plans.iter().map(|p| (p.table.name.as_str(), p)).collect();

    let mut sink = StatementSink::default();
    if options.wrap_in_transaction {
        sink.push(
            StatementType::Begin,
            "BEGIN;".to_string(),
            "Begin transaction".to_string(),
            None,
        );
    }

    for plan in &plans {
        match plan.status() {
            ImportStatus::Skip => {
                debug!(table = %plan.table.name, "Skipping table");
            }
            ImportStatus::New => emit_create(&mut sink, ctx.schema, plan, &targets, options),
            ImportStatus::Augment => {
                emit_add_columns(&mut sink, ctx.schema, plan);
                emit_alter_conflicts(&mut sink, ctx.schema, plan);
            }
            ImportStatus::Insert | ImportStatus::Conflict => {
                emit_alter_conflicts(&mut sink, ctx.schema, plan);
            }
        }
    }

    let ddl_count = sink.len();
    for plan in &plans {
        if plan.status() == ImportStatus::Skip {
            continue;
        }
        let rows = selected_rows(ctx, plan.table);
        emit_inserts(&mut sink, ctx.schema, plan, &rows, &remapper, options);
    }
    let insert_count = sink.len() - ddl_count;

    if options.wrap_in_transaction {
        sink.push(
            StatementType::Commit,
            "COMMIT;".to_string(),
            "Commit transaction".to_string(),
            None,
        );
    }

    info!(
        tables = plans.len(),
        statements = sink.len(),
        inserts = insert_count,
        "Generated import script"
    );
    sink.into_statements()
}

fn plan_tables<'a>(ctx: &ImportContext<'a>) -> Vec<TablePlan<'a>> {
    let parents: HashMap<&str, &str> = ctx
        .relationships
        .iter()
        .map(|r| (r.child_table.as_str(), r.parent_table.as_str()))
        .collect();

    let mut plans: Vec<TablePlan<'a>> = ctx
        .tables
        .iter()
        .map(|table| {
            let mut result = ctx
                .matches
                .iter()
                .find(|m| m.import_table == table.name)
                .cloned()
                .unwrap_or_else(|| TableMatchResult::new_table(&table.name));

            let review = ctx.overrides.and_then(|o| o.get(&table.name));
            if let Some(review) = review {
                result.apply_override(review);
            }

            let existing = result.existing_table.as_deref().and_then(|name| {
                ctx.existing_schemas
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
            });

            // Only created tables may be renamed; the rest write to the matched table
            let target = match (result.status, &result.existing_table) {
                (ImportStatus::New, _) | (_, None) => review
                    .and_then(|r| r.target_table.clone())
                    .unwrap_or_else(|| table.name.clone()),
                (_, Some(existing_name)) => existing_name.clone(),
            };

            if result.status != ImportStatus::New && existing.is_none() {
                warn!(
                    table = %table.name,
                    status = ?result.status,
                    "No existing schema for matched table, creating it instead"
                );
                result.status = ImportStatus::New;
            }

            TablePlan {
                table,
                parent: parents.get(table.name.as_str()).copied(),
                depth: relationship_depth(&table.name, &parents, ctx.tables.len()),
                result,
                target,
                existing,
            }
        })
        .collect();

    plans.sort_by_key(|p| p.depth);
    plans
}

/// Number of ancestor hops from a table to its root
fn relationship_depth<'a>(table: &'a str, parents: &HashMap<&'a str, &'a str>, limit: usize) -> usize {
    let mut depth = 0;
    let mut current = table;
    while let Some(&parent) = parents.get(current) {
        depth += 1;
        current = parent;
        if depth > limit {
            break;
        }
    }
    depth
}

fn selected_rows<'a>(ctx: &ImportContext<'_>, table: &'a JsonTable) -> Vec<&'a Row> {
    match ctx.selected_rows.and_then(|s| s.get(&table.name)) {
        Some(indices) => indices.iter().filter_map(|&i| table.rows.get(i)).collect(),
        None => table.rows.iter().collect(),
    }
}

fn emit_create(
    sink: &mut StatementSink,
    schema: &str,
    plan: &TablePlan<'_>,
    targets: &HashMap<&str, &TablePlan<'_>>,
    options: &GeneratorOptions,
) {
    let table_name = qualified_name(schema, &plan.target);
    let mut column_defs = vec![format!(
        "  {} UUID PRIMARY KEY DEFAULT gen_random_uuid()",
        quote_identifier(PRIMARY_KEY_COLUMN)
    )];
    let mut indexed = Vec::new();

    for column in plan.table.data_columns() {
        let created = created_column(plan.table, &column.name);
        let mut def = format!(
            "  {} {}",
            quote_identifier(&column.name),
            created.column_type.as_sql()
        );
        if created.not_null {
            def.push_str(" NOT NULL");
        }
        column_defs.push(def);

        if created.suggest_index {
            indexed.push(column.name.as_str());
        }
    }

    if let Some(parent) = plan.parent {
        let mut def = format!("  {} UUID", quote_identifier(PARENT_ID_COLUMN));
        // Skipped or existing parents are not created here, so no constraint
        let created_parent = targets
            .get(parent)
            .filter(|p| p.status() == ImportStatus::New);
        if let Some(parent_plan) = created_parent {
            def.push_str(&format!(
                " REFERENCES {}({}) ON DELETE CASCADE",
                qualified_name(schema, &parent_plan.target),
                quote_identifier(PRIMARY_KEY_COLUMN)
            ));
        }
        column_defs.push(def);
        indexed.push(PARENT_ID_COLUMN);
    }

    let sql = format!("CREATE TABLE {} (\n{}\n);", table_name, column_defs.join(",\n"));
    sink.push(
        StatementType::CreateTable,
        sql,
        format!(
            "Create table {} ({} columns)",
            plan.target,
            column_defs.len()
        ),
        Some(&plan.target),
    );

    if !options.create_indexes {
        return;
    }
    for column in indexed {
        let index_name: String = format!("idx_{}_{}", plan.target, column)
            .chars()
            .take(MAX_IDENTIFIER_LENGTH)
            .collect();
        sink.push(
            StatementType::CreateIndex,
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                quote_identifier(&index_name),
                table_name,
                quote_identifier(column)
            ),
            format!("Index {}.{}", plan.target, column),
            Some(&plan.target),
        );
    }
}

fn emit_add_columns(sink: &mut StatementSink, schema: &str, plan: &TablePlan<'_>) {
    let table_name = qualified_name(schema, &plan.target);
    for column in &plan.result.missing_columns {
        let column_type = plan.table.infer_column(column).inferred_type;
        sink.push(
            StatementType::AlterTable,
            format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {};",
                table_name,
                quote_identifier(column),
                column_type.as_sql()
            ),
            format!("Add column {} {} to {}", column, column_type, plan.target),
            Some(&plan.target),
        );
    }
}

fn emit_alter_conflicts(sink: &mut StatementSink, schema: &str, plan: &TablePlan<'_>) {
    let table_name = qualified_name(schema, &plan.target);
    for conflict in &plan.result.conflicts {
        if conflict.resolution != ConflictResolution::Alter {
            continue;
        }
        let widened = widened_type(conflict.import_type, &conflict.existing_type);
        let column = quote_identifier(&conflict.existing_column);
        sink.push(
            StatementType::AlterTable,
            format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
                table_name,
                column,
                widened.as_sql(),
                column,
                widened.as_sql()
            ),
            format!(
                "Widen {}.{} from {} to {}",
                plan.target, conflict.existing_column, conflict.existing_type, widened
            ),
            Some(&plan.target),
        );
    }
}

/// Declaration of a column the script creates, from every value of the column
struct CreatedColumn {
    column_type: ColumnType,
    not_null: bool,
    /// Set when some values don't fit the inferred type; those become NULL
    cast: Option<CastingRule>,
    suggest_index: bool,
}

fn created_column(table: &JsonTable, name: &str) -> CreatedColumn {
    let inference = table.infer_column(name);
    let column_type = inference.inferred_type;
    let has_outliers = table
        .column_values(name)
        .any(|v| !patterns::is_empty(v) && !column_type.accepts(v));

    CreatedColumn {
        column_type,
        not_null: !inference.nullable && !has_outliers,
        cast: has_outliers.then(|| CastingRule::new(column_type).null_on_failure(true)),
        suggest_index: inference.suggest_index,
    }
}

/// Type that holds both the existing column's values and the imported ones
fn widened_type(import_type: ColumnType, existing_type: &str) -> ColumnType {
    match ColumnType::from_sql_name(existing_type) {
        Some(existing) => existing.widen(import_type),
        None => ColumnType::Text,
    }
}

/// Columns written by the INSERTs of a table, in statement order
fn insert_columns(plan: &TablePlan<'_>, options: &GeneratorOptions) -> Vec<InsertColumn> {
    let mut columns = Vec::new();

    let Some(existing) = plan.existing.filter(|_| plan.status() != ImportStatus::New) else {
        columns.push(InsertColumn {
            target: PRIMARY_KEY_COLUMN.to_string(),
            source: ColumnSource::Identity,
            column_type: Some(ColumnType::Uuid),
        });
        for column in plan.table.data_columns() {
            let created = created_column(plan.table, &column.name);
            columns.push(InsertColumn {
                target: column.name.clone(),
                source: ColumnSource::Data {
                    name: column.name.clone(),
                    cast: created.cast,
                },
                column_type: Some(created.column_type),
            });
        }
        if plan.parent.is_some() {
            columns.push(InsertColumn {
                target: PARENT_ID_COLUMN.to_string(),
                source: ColumnSource::Parent,
                column_type: Some(ColumnType::Uuid),
            });
        }
        return columns;
    };

    if let Some(id_column) = existing.column(IDENTITY_COLUMN) {
        if types_compatible(ColumnType::Uuid, &id_column.data_type) {
            columns.push(InsertColumn {
                target: id_column.name.clone(),
                source: ColumnSource::Identity,
                column_type: Some(ColumnType::Uuid),
            });
        }
    }

    for matched in &plan.result.column_matches {
        if matched.existing_column.eq_ignore_ascii_case(IDENTITY_COLUMN) {
            debug!(
                table = %plan.target,
                column = %matched.import_column,
                "Identity column takes remapped ids, leaving source column out"
            );
            continue;
        }
        let resolution = plan.result.resolution_for(&matched.import_column);
        if resolution.is_some_and(ConflictResolution::omits_column) {
            debug!(
                table = %plan.target,
                column = %matched.existing_column,
                "Leaving conflicting column out of the insert"
            );
            continue;
        }

        let existing_type = ColumnType::from_sql_name(&matched.existing_type);
        let (column_type, cast) = match resolution {
            Some(ConflictResolution::Alter) => (
                Some(widened_type(matched.import_type, &matched.existing_type)),
                None,
            ),
            Some(ConflictResolution::Cast) => (
                existing_type,
                existing_type
                    .map(|ty| CastingRule::new(ty).null_on_failure(options.null_on_cast_failure)),
            ),
            _ => (existing_type, None),
        };

        columns.push(InsertColumn {
            target: matched.existing_column.clone(),
            source: ColumnSource::Data {
                name: matched.import_column.clone(),
                cast,
            },
            column_type,
        });
    }

    if plan.status() == ImportStatus::Augment {
        for missing in &plan.result.missing_columns {
            let created = created_column(plan.table, missing);
            columns.push(InsertColumn {
                target: missing.clone(),
                source: ColumnSource::Data {
                    name: missing.clone(),
                    cast: created.cast,
                },
                column_type: Some(created.column_type),
            });
        }
    }

    if plan.parent.is_some() {
        if let Some(parent_column) = existing.column(PARENT_ID_COLUMN) {
            columns.push(InsertColumn {
                target: parent_column.name.clone(),
                source: ColumnSource::Parent,
                column_type: ColumnType::from_sql_name(&parent_column.data_type),
            });
        }
    }

    columns
}

fn emit_inserts(
    sink: &mut StatementSink,
    schema: &str,
    plan: &TablePlan<'_>,
    rows: &[&Row],
    remapper: &IdRemapper,
    options: &GeneratorOptions,
) {
    let columns = insert_columns(plan, options);
    if columns.is_empty() {
        warn!(table = %plan.target, "No columns to insert, skipping data");
        return;
    }

    let batch_size = calculate_batch_size(columns.len(), rows.len());
    if batch_size == 0 {
        debug!(table = %plan.target, "No rows selected");
        return;
    }

    let table_name = qualified_name(schema, &plan.target);
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(&c.target))
        .collect::<Vec<_>>()
        .join(", ");
    let mut cast_failures = 0usize;
    let mut unresolved_parents = 0usize;

    debug!(
        table = %plan.target,
        rows = rows.len(),
        batch_size,
        "Batching inserts"
    );

    for (batch_idx, batch) in rows.chunks(batch_size).enumerate() {
        let mut tuples = Vec::with_capacity(batch.len());
        for row in batch {
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = column_value(
                    plan,
                    row,
                    column,
                    remapper,
                    &mut cast_failures,
                    &mut unresolved_parents,
                );
                values.push(format_value(&value, column.column_type));
            }
            tuples.push(format!("  ({})", values.join(", ")));
        }

        let first = batch_idx * batch_size + 1;
        let last = first + batch.len() - 1;
        sink.push(
            StatementType::Insert,
            format!(
                "INSERT INTO {} ({}) VALUES\n{};",
                table_name,
                column_list,
                tuples.join(",\n")
            ),
            format!(
                "Insert rows {}-{} of {} into {}",
                first,
                last,
                rows.len(),
                plan.target
            ),
            Some(&plan.target),
        );
    }

    if cast_failures > 0 {
        warn!(
            table = %plan.target,
            failures = cast_failures,
            "Values could not be cast to the column type"
        );
    }
    if unresolved_parents > 0 {
        warn!(
            table = %plan.target,
            rows = unresolved_parents,
            "Parent ids could not be resolved, keeping the original values"
        );
    }
}

fn column_value(
    plan: &TablePlan<'_>,
    row: &Row,
    column: &InsertColumn,
    remapper: &IdRemapper,
    cast_failures: &mut usize,
    unresolved_parents: &mut usize,
) -> Value {
    match &column.source {
        ColumnSource::Identity => JsonTable::row_id(row)
            .and_then(|id| remapper.final_id(&plan.table.name, id))
            .map(|id| Value::String(id.to_string()))
            .unwrap_or(Value::Null),
        ColumnSource::Parent => {
            let Some(parent_id) = JsonTable::parent_id(row) else {
                return Value::Null;
            };
            match plan.parent.and_then(|p| remapper.final_id(p, parent_id)) {
                Some(final_id) => Value::String(final_id.to_string()),
                None => {
                    *unresolved_parents += 1;
                    parent_id.clone()
                }
            }
        }
        ColumnSource::Data { name, cast } => {
            let value = row.get(name).cloned().unwrap_or(Value::Null);
            let Some(rule) = cast else {
                return value;
            };
            match attempt_cast(&value, rule) {
                CastOutcome::Converted(converted) => converted,
                CastOutcome::Nulled { reason } => {
                    *cast_failures += 1;
                    debug!(table = %plan.target, %reason, "Cast failed, writing NULL");
                    Value::Null
                }
                CastOutcome::Failed { reason } => {
                    *cast_failures += 1;
                    debug!(table = %plan.target, %reason, "Cast failed, keeping value");
                    value
                }
            }
        }
    }
}
