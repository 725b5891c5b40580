//! SQL compilation: descriptor + model → parameterized statement.
//!
//! Compilation is pure. Entity and column names are resolved against the
//! registry up front, literals are serialized to their declared column types,
//! and the statement is rendered through sea-query's `PostgresQueryBuilder`,
//! which owns identifier quoting and `$N` placeholder syntax. Every literal
//! becomes a positional bind value; nothing caller-supplied is ever
//! interpolated into the SQL text.

use crate::dialect::{self, SqlIdent};
use crate::error::SluiceError;
use crate::model::{EntityDef, ModelRegistry};
use crate::query::{
    CompareOp, Delete, Insert, Predicate, QueryDescriptor, Select, SortOrder, Update,
};
use crate::record::Record;
use sea_query::{
    Condition, DeleteStatement, Expr, ExprTrait, InsertStatement, Order, PostgresQueryBuilder,
    SelectStatement, UpdateStatement, Values,
};
use std::fmt;

/// What a compiled statement does, with the context the engine needs to shape
/// the result
#[derive(Debug, Clone)]
pub enum StatementKind {
    Select {
        entity: String,
        /// Projected columns in statement order
        columns: Vec<String>,
        single_row: bool,
    },
    Insert {
        entity: String,
    },
    Update {
        entity: String,
    },
    Delete {
        entity: String,
    },
}

impl StatementKind {
    pub fn entity(&self) -> &str {
        match self {
            StatementKind::Select { entity, .. }
            | StatementKind::Insert { entity }
            | StatementKind::Update { entity }
            | StatementKind::Delete { entity } => entity,
        }
    }
}

/// Immutable compiled statement: SQL text with positional placeholders plus
/// the ordered bind values. Safe to log as-is.
#[derive(Debug, Clone)]
pub struct CompiledStatement {
    kind: StatementKind,
    sql: String,
    binds: Values,
}

impl CompiledStatement {
    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &Values {
        &self.binds
    }
}

impl fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} binds]", self.sql, self.binds.iter().count())
    }
}

/// Compile a descriptor against the model.
///
/// INSERT descriptors are compiled from their (already resolved) entries; run
/// the key/default resolver first when generated keys are wanted.
///
/// # Errors
///
/// `UnknownEntity` / `UnknownColumn` for names absent from the model,
/// `InvalidDescriptor` for structurally malformed input, `ValueConversion`
/// for literals that do not fit their column's declared type. None of these
/// touch the database.
pub fn compile(
    registry: &ModelRegistry,
    descriptor: &QueryDescriptor,
) -> Result<CompiledStatement, SluiceError> {
    match descriptor {
        QueryDescriptor::Select(select) => compile_select(registry, select),
        QueryDescriptor::Insert(insert) => {
            let entries = insert.normalized_entries()?;
            compile_insert(registry, insert, &entries)
        }
        QueryDescriptor::Update(update) => compile_update(registry, update),
        QueryDescriptor::Delete(delete) => compile_delete(registry, delete),
    }
}

pub(crate) fn compile_select(
    registry: &ModelRegistry,
    select: &Select,
) -> Result<CompiledStatement, SluiceError> {
    let entity = registry.entity(select.entity())?;

    // Positive-only projection: explicit columns, or every declared column in
    // declaration order. Never `*`, so decoding stays positional.
    let columns: Vec<String> = match select.projection() {
        Some(projection) => {
            for name in projection {
                entity.require_column(name)?;
            }
            projection.to_vec()
        }
        None => entity.columns().iter().map(|c| c.name().to_string()).collect(),
    };

    let mut query = SelectStatement::default();
    query.columns(columns.iter().map(|c| SqlIdent(c.clone())));
    query.from(SqlIdent(entity.table().to_string()));

    if let Some(predicate) = select.predicate() {
        query.cond_where(predicate_condition(entity, predicate)?);
    }
    for (column, order) in select.order() {
        entity.require_column(column)?;
        let direction = match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        query.order_by(SqlIdent(column.clone()), direction);
    }

    // single_row forces an implicit LIMIT 1.
    if select.is_single_row() {
        query.limit(1);
    } else if let Some(limit) = select.limit_clause() {
        // u64::MAX marks "offset without limit" from the builder.
        if limit.rows != u64::MAX {
            query.limit(limit.rows);
        }
        if let Some(offset) = limit.offset {
            query.offset(offset);
        }
    }

    let (sql, binds) = query.build(PostgresQueryBuilder);
    Ok(CompiledStatement {
        kind: StatementKind::Select {
            entity: entity.name().to_string(),
            columns,
            single_row: select.is_single_row(),
        },
        sql,
        binds,
    })
}

pub(crate) fn compile_insert(
    registry: &ModelRegistry,
    insert: &Insert,
    entries: &[Record],
) -> Result<CompiledStatement, SluiceError> {
    let entity = registry.entity(insert.entity())?;
    if entries.is_empty() {
        return Err(SluiceError::InvalidDescriptor {
            detail: format!("INSERT into {} carries no entries", entity.name()),
        });
    }

    // Statement column list: union of columns across all entries, first-seen
    // order, validated against the model.
    let mut columns: Vec<String> = Vec::new();
    for entry in entries {
        for name in entry.columns() {
            entity.require_column(name)?;
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }

    let mut query = InsertStatement::default();
    query.into_table(SqlIdent(entity.table().to_string()));
    query.columns(columns.iter().map(|c| SqlIdent(c.clone())));

    // One multi-row statement keeps the write atomic: all entries or none.
    for entry in entries {
        let mut row = Vec::with_capacity(columns.len());
        for name in &columns {
            let column = entity.require_column(name)?;
            let value = match entry.get(name) {
                Some(value) => dialect::serialize_value(column, value)?,
                None => dialect::null_value(column.column_type()),
            };
            row.push(Expr::val(value));
        }
        query.values_panic(row);
    }

    let (sql, binds) = query.build(PostgresQueryBuilder);
    Ok(CompiledStatement {
        kind: StatementKind::Insert {
            entity: entity.name().to_string(),
        },
        sql,
        binds,
    })
}

pub(crate) fn compile_update(
    registry: &ModelRegistry,
    update: &Update,
) -> Result<CompiledStatement, SluiceError> {
    let entity = registry.entity(update.entity())?;
    if update.values().is_empty() {
        return Err(SluiceError::InvalidDescriptor {
            detail: format!("UPDATE of {} sets no columns", entity.name()),
        });
    }

    let mut query = UpdateStatement::default();
    query.table(SqlIdent(entity.table().to_string()));
    for (name, value) in update.values().iter() {
        let column = entity.require_column(name)?;
        let value = dialect::serialize_value(column, value)?;
        query.value(SqlIdent(name.to_string()), Expr::val(value));
    }
    if let Some(predicate) = update.predicate() {
        query.cond_where(predicate_condition(entity, predicate)?);
    }

    let (sql, binds) = query.build(PostgresQueryBuilder);
    Ok(CompiledStatement {
        kind: StatementKind::Update {
            entity: entity.name().to_string(),
        },
        sql,
        binds,
    })
}

pub(crate) fn compile_delete(
    registry: &ModelRegistry,
    delete: &Delete,
) -> Result<CompiledStatement, SluiceError> {
    let entity = registry.entity(delete.entity())?;

    let mut query = DeleteStatement::default();
    query.from_table(SqlIdent(entity.table().to_string()));
    if let Some(predicate) = delete.predicate() {
        query.cond_where(predicate_condition(entity, predicate)?);
    }

    let (sql, binds) = query.build(PostgresQueryBuilder);
    Ok(CompiledStatement {
        kind: StatementKind::Delete {
            entity: entity.name().to_string(),
        },
        sql,
        binds,
    })
}

/// Translate a predicate tree into a sea-query condition, validating columns
/// and serializing literals along the way. Children keep their declaration
/// order, so bind positions follow the order the caller wrote the filter.
fn predicate_condition(entity: &EntityDef, predicate: &Predicate) -> Result<Condition, SluiceError> {
    match predicate {
        Predicate::Compare { .. } => Ok(Condition::all().add(compare_expr(entity, predicate)?)),
        Predicate::And(children) => {
            let mut condition = Condition::all();
            for child in children {
                // Leaves join the conjunction directly; only genuinely nested
                // AND nodes become sub-conditions.
                condition = match child {
                    Predicate::Compare { .. } => condition.add(compare_expr(entity, child)?),
                    Predicate::And(_) => condition.add(predicate_condition(entity, child)?),
                };
            }
            Ok(condition)
        }
    }
}

fn compare_expr(entity: &EntityDef, predicate: &Predicate) -> Result<Expr, SluiceError> {
    let Predicate::Compare { column, op, value } = predicate else {
        return Err(SluiceError::InvalidDescriptor {
            detail: "expected a comparison leaf".to_string(),
        });
    };
    let def = entity.require_column(column)?;
    let value = dialect::serialize_value(def, value)?;
    let lhs = Expr::col(SqlIdent(column.clone()));
    Ok(match op {
        CompareOp::Eq => lhs.eq(Expr::val(value)),
        CompareOp::Ne => lhs.ne(Expr::val(value)),
        CompareOp::Lt => lhs.lt(Expr::val(value)),
        CompareOp::Le => lhs.lte(Expr::val(value)),
        CompareOp::Gt => lhs.gt(Expr::val(value)),
        CompareOp::Ge => lhs.gte(Expr::val(value)),
    })
}
