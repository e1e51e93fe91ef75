//! SQL compiler that turns merged query variables into a Postgres query
//! using sea-query. Reference backend for the filter tree.

use sea_query::{
    Asterisk, Cond, ConditionalStatement, Expr, Func, Iden, JoinType, NullOrdering, Order, OrderedStatement,
    PostgresQueryBuilder, SelectStatement, SimpleExpr, Value,
};
use serde_json::Value as Json;
use std::fmt;

use crate::condition::{Condition, Scalar};
use crate::config::ListConfig;
use crate::filter::{FieldCondition, Filter, FilterGroup, CUSTOM_FIELD, SEARCH_FIELD};
use crate::query_variables::{QueryVariables, SortingOrder};

/// Configuration for SQL optimization
#[derive(Debug, Clone)]
pub struct OptimizationConfig {
    /// Minimum number of single-equality OR groups rewritten as one IN clause
    pub max_or_conditions_for_in: usize,
    /// IN lists longer than this are reported
    pub max_in_values: usize,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_or_conditions_for_in: 5,
            max_in_values: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub table: String,
    /// Columns matched by the free-text search
    pub searchable_columns: Vec<String>,
    pub optimization: OptimizationConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::from_list_config(&ListConfig::default())
    }
}

impl CompilerConfig {
    pub fn from_list_config(config: &ListConfig) -> Self {
        Self {
            table: config.table.clone(),
            searchable_columns: config.searchable_columns.clone(),
            optimization: OptimizationConfig::default(),
        }
    }
}

/// Table identifier wrapper
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Represents an optimization applied during compilation
#[derive(Debug, Clone, PartialEq)]
pub enum Optimization {
    OrToIn { field: String, value_count: usize },
    LargeInList { field: String, value_count: usize },
}

/// Result of SQL compilation with optimization information
#[derive(Debug)]
pub struct CompileResult {
    pub sql: String,
    pub optimizations: Vec<Optimization>,
}

/// `(parent table, relation)` pairs, in the order they must be joined.
type Joins = Vec<(String, String)>;

pub struct SqlCompiler {
    config: CompilerConfig,
}

impl SqlCompiler {
    pub fn new(table: impl Into<String>) -> Self {
        Self::from_config(CompilerConfig {
            table: table.into(),
            ..CompilerConfig::default()
        })
    }

    pub fn from_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// `SELECT *` with filter, sorting and pagination.
    pub fn compile(&self, variables: &QueryVariables) -> Result<CompileResult, CompileError> {
        let mut optimizations = Vec::new();
        let mut select = SelectStatement::new();
        select.column(Asterisk);
        self.apply_filter(&mut select, variables.filter.as_ref(), &mut optimizations)?;

        for sorting in variables.sorting.iter().flatten() {
            let column = (TableName(self.config.table.clone()), ColumnName(sorting.field.clone()));
            let order = match sorting.order {
                SortingOrder::Asc => Order::Asc,
                SortingOrder::Desc => Order::Desc,
            };
            if sorting.empty_string_as_highest == Some(true) {
                select.order_by_expr(Expr::col(column.clone()).eq(""), order.clone());
            }
            if sorting.null_as_highest == Some(true) {
                let nulls = match sorting.order {
                    SortingOrder::Asc => NullOrdering::Last,
                    SortingOrder::Desc => NullOrdering::First,
                };
                select.order_by_with_nulls(column, order, nulls);
            } else {
                select.order_by(column, order);
            }
        }

        if let Some(pagination) = variables.pagination {
            select.limit(pagination.page_size).offset(pagination.effective_offset());
        }

        Ok(CompileResult {
            sql: select.to_string(PostgresQueryBuilder),
            optimizations,
        })
    }

    /// `SELECT COUNT(*)` under the same filter; pagination and sorting are
    /// ignored.
    pub fn compile_count(&self, variables: &QueryVariables) -> Result<CompileResult, CompileError> {
        let mut optimizations = Vec::new();
        let mut select = SelectStatement::new();
        select.expr(Func::count(Expr::col(Asterisk)));
        self.apply_filter(&mut select, variables.filter.as_ref(), &mut optimizations)?;

        Ok(CompileResult {
            sql: select.to_string(PostgresQueryBuilder),
            optimizations,
        })
    }

    fn apply_filter(
        &self,
        select: &mut SelectStatement,
        filter: Option<&Filter>,
        optimizations: &mut Vec<Optimization>,
    ) -> Result<(), CompileError> {
        select.from(TableName(self.config.table.clone()));
        let Some(filter) = filter.filter(|f| !f.is_empty()) else {
            return Ok(());
        };

        if let Some(expr) = self.try_optimize_or_to_in(filter, optimizations) {
            select.and_where(expr);
            return Ok(());
        }

        let mut joins = Joins::new();
        let mut any = Cond::any();
        for group in &filter.groups {
            any = any.add(self.compile_group(&self.config.table, group, &mut joins, optimizations)?);
        }

        for (parent, relation) in joins {
            select.join(
                JoinType::LeftJoin,
                TableName(relation.clone()),
                Expr::col((TableName(relation.clone()), ColumnName("id".to_string())))
                    .equals((TableName(parent), ColumnName(format!("{}_id", relation)))),
            );
        }
        select.cond_where(any);
        Ok(())
    }

    /// Compile one AND-group; joined groups apply to the related table
    fn compile_group(
        &self,
        table: &str,
        group: &FilterGroup,
        joins: &mut Joins,
        optimizations: &mut Vec<Optimization>,
    ) -> Result<Cond, CompileError> {
        let mut all = Cond::all();
        for condition in &group.conditions {
            for (field, value) in condition.fields() {
                all = all.add(self.compile_leaf(table, field, value, optimizations)?);
            }
        }

        for (relation, join) in &group.joins {
            let edge = (table.to_string(), relation.clone());
            if !joins.contains(&edge) {
                joins.push(edge);
            }
            all = all.add(self.compile_group(relation, join, joins, optimizations)?);
        }

        Ok(all)
    }

    fn compile_leaf(
        &self,
        table: &str,
        field: &str,
        value: &FieldCondition,
        optimizations: &mut Vec<Optimization>,
    ) -> Result<Cond, CompileError> {
        let expr = match value {
            FieldCondition::Operator(condition) => self.compile_condition(table, field, condition, optimizations)?,
            FieldCondition::Raw(payload) if field == CUSTOM_FIELD => return self.compile_custom(table, payload),
            FieldCondition::Raw(Json::Null) => column(table, field).is_null(),
            FieldCondition::Raw(Json::Bool(b)) => column(table, field).eq(*b),
            FieldCondition::Raw(Json::String(s)) => column(table, field).eq(s.clone()),
            FieldCondition::Raw(Json::Number(n)) => match n.as_i64() {
                Some(i) => column(table, field).eq(i),
                None => column(table, field).eq(n.as_f64().unwrap_or_default()),
            },
            FieldCondition::Raw(other) => {
                return Err(CompileError::new(format!("Unsupported condition on {}: {}", field, other)));
            }
        };
        Ok(Cond::all().add(expr))
    }

    /// Compile a typed condition; `have` and `empty` target the `<field>_id`
    /// foreign key
    fn compile_condition(
        &self,
        table: &str,
        field: &str,
        condition: &Condition,
        optimizations: &mut Vec<Optimization>,
    ) -> Result<SimpleExpr, CompileError> {
        let col = column(table, field);
        let foreign_key = format!("{}_id", field);

        let expr = match condition {
            Condition::Equal(op) => negate(col.eq(scalar_value(&op.value)), op.not),
            Condition::Like(op) => {
                let pattern = op.value.to_string();
                if op.not {
                    col.not_like(pattern)
                } else {
                    col.like(pattern)
                }
            }
            Condition::In(op) => {
                self.note_in_list(field, op.values.len(), optimizations);
                let values = op.values.iter().map(scalar_value);
                if op.not {
                    col.is_not_in(values)
                } else {
                    col.is_in(values)
                }
            }
            Condition::Have(op) => {
                self.note_in_list(field, op.values.len(), optimizations);
                let values = op.values.iter().map(scalar_value);
                let key = column(table, &foreign_key);
                if op.not {
                    key.is_not_in(values)
                } else {
                    key.is_in(values)
                }
            }
            Condition::Empty(op) => {
                let key = column(table, &foreign_key);
                if op.not {
                    key.is_not_null()
                } else {
                    key.is_null()
                }
            }
            Condition::Null(op) => {
                if op.not {
                    col.is_not_null()
                } else {
                    col.is_null()
                }
            }
            Condition::Between(op) => {
                let (from, to) = (scalar_value(&op.from), scalar_value(&op.to));
                if op.not {
                    col.not_between(from, to)
                } else {
                    col.between(from, to)
                }
            }
            Condition::Greater(op) => negate(col.gt(scalar_value(&op.value)), op.not),
            Condition::GreaterOrEqual(op) => negate(col.gte(scalar_value(&op.value)), op.not),
            Condition::Less(op) => negate(col.lt(scalar_value(&op.value)), op.not),
            Condition::LessOrEqual(op) => negate(col.lte(scalar_value(&op.value)), op.not),
            Condition::Custom(_) => {
                return Err(CompileError::new(format!("Unsupported custom condition on {}", field)));
            }
        };

        Ok(expr)
    }

    /// `{custom: {search: {value}}}` becomes a LIKE over every searchable
    /// column. Other custom operators are backend specific.
    fn compile_custom(&self, table: &str, payload: &Json) -> Result<Cond, CompileError> {
        let Json::Object(operators) = payload else {
            return Err(CompileError::new(format!("Custom condition must be an object, found {}", payload)));
        };

        let mut all = Cond::all();
        for (operator, payload) in operators {
            if operator != SEARCH_FIELD {
                return Err(CompileError::new(format!("Unsupported custom condition: {}", operator)));
            }
            if self.config.searchable_columns.is_empty() {
                return Err(CompileError::new("No searchable columns configured".to_string()));
            }
            let term = match payload.get("value") {
                Some(Json::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(CompileError::new("Search condition without value".to_string())),
            };

            let pattern = format!("%{}%", term);
            let mut any = Cond::any();
            for searchable in &self.config.searchable_columns {
                any = any.add(column(table, searchable).like(pattern.clone()));
            }
            all = all.add(any);
        }
        Ok(all)
    }

    /// OR groups that each hold one `equal` on the same column become one IN
    fn try_optimize_or_to_in(&self, filter: &Filter, optimizations: &mut Vec<Optimization>) -> Option<SimpleExpr> {
        if filter.groups.len() < self.config.optimization.max_or_conditions_for_in {
            return None;
        }

        let mut field: Option<&String> = None;
        let mut values = Vec::with_capacity(filter.groups.len());
        for group in &filter.groups {
            if !group.joins.is_empty() || group.conditions.len() != 1 {
                return None;
            }
            let mut entries = group.conditions[0].fields();
            let (name, FieldCondition::Operator(Condition::Equal(op))) = entries.next()? else {
                return None;
            };
            if entries.next().is_some() || op.not {
                return None;
            }
            match field {
                None => field = Some(name),
                Some(seen) if seen == name => {}
                Some(_) => return None,
            }
            values.push(scalar_value(&op.value));
        }

        let field = field?;
        optimizations.push(Optimization::OrToIn {
            field: field.clone(),
            value_count: values.len(),
        });
        Some(column(&self.config.table, field).is_in(values))
    }

    fn note_in_list(&self, field: &str, value_count: usize, optimizations: &mut Vec<Optimization>) {
        if value_count > self.config.optimization.max_in_values {
            optimizations.push(Optimization::LargeInList {
                field: field.to_string(),
                value_count,
            });
        }
    }
}

fn column(table: &str, field: &str) -> Expr {
    Expr::col((TableName(table.to_string()), ColumnName(field.to_string())))
}

fn negate(expr: SimpleExpr, not: bool) -> SimpleExpr {
    if not {
        expr.not()
    } else {
        expr
    }
}

fn scalar_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Bool(b) => (*b).into(),
        Scalar::Int(n) => (*n).into(),
        Scalar::Float(n) => (*n).into(),
        Scalar::String(s) => s.clone().into(),
    }
}
