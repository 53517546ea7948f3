use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{is_valid_identifier, quote_column, FilterWhere};
use super::types::{
    FilterJoin, FilterOp, FilterOrderInfo, FilterValue, FilterWhereInfo, Filterable, Page, SortDirection,
    SqlResult,
};

/// Composable search predicate over one table.
///
/// A `Filter` is a plain value: building one never touches the database. It can be
/// rendered to parameterised SQL (`to_sql` / `to_count_sql`) or applied directly to
/// in-memory records (`apply`), so both storage drivers share one predicate.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    joins: Vec<FilterJoin>,
    conditions: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_valid_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", table_name)));
        }
        Ok(Self {
            table_name,
            joins: vec![],
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.conditions
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.conditions.push(FilterWhereInfo {
            column: column.into(),
            operator: FilterOp::Eq,
            data: value.into(),
        });
        self
    }

    pub fn like(mut self, column: impl Into<String>, text: impl Into<String>) -> Self {
        self.conditions.push(FilterWhereInfo {
            column: column.into(),
            operator: FilterOp::Like,
            data: FilterValue::Text(text.into()),
        });
        self
    }

    /// Substring match, skipped when `text` is empty
    pub fn like_if_present(self, column: &str, text: &str) -> Self {
        if text.is_empty() { self } else { self.like(column, text) }
    }

    /// Equality, skipped when `value` is zero
    pub fn eq_if_nonzero(self, column: &str, value: i32) -> Self {
        if value == 0 { self } else { self.eq(column, value) }
    }

    /// Identifier equality. Empty or malformed identifiers impose no condition.
    pub fn eq_uuid_if_valid(self, column: &str, raw: &str) -> Self {
        if raw.is_empty() {
            return self;
        }
        match uuid::Uuid::parse_str(raw) {
            Ok(id) => self.eq(column, id),
            Err(_) => {
                tracing::debug!("Ignoring malformed identifier filter {}={}", column, raw);
                self
            }
        }
    }

    /// Inner join `table` ON `left = right`; both sides are qualified column names
    pub fn join(mut self, table: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        let table = table.into();
        if self.joins.iter().all(|j| j.table != table) {
            self.joins.push(FilterJoin { table, left: left.into(), right: right.into() });
        }
        self
    }

    pub fn order(mut self, column: impl Into<String>, sort: SortDirection) -> Self {
        self.order_data.push(FilterOrderInfo { column: column.into(), sort, nulls_last: false });
        self
    }

    pub fn order_nulls_last(mut self, column: impl Into<String>, sort: SortDirection) -> Self {
        self.order_data.push(FilterOrderInfo { column: column.into(), sort, nulls_last: true });
        self
    }

    pub fn limit(mut self, limit: i64, offset: Option<i64>) -> Result<Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn paginate(self, page: Page) -> Result<Self, FilterError> {
        self.limit(page.size, Some(page.offset()))
    }

    /// `SELECT "table".* ...` with joins, predicate, ordering and window
    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.table_name, &self.conditions, 0)?;
        let order_clause = FilterOrder::generate(&self.table_name, &self.order_data)?;

        let query = [
            format!("SELECT \"{}\".*", self.table_name),
            self.build_from_clause()?,
            format!("WHERE {}", where_clause),
            order_clause,
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    /// Count of rows matching the predicate, ignoring ordering and window
    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.table_name, &self.conditions, 0)?;
        let query = format!("SELECT COUNT(*) AS count {} WHERE {}", self.build_from_clause()?, where_clause);
        Ok(SqlResult { query, params })
    }

    /// Apply predicate, ordering and window to in-memory records.
    /// Returns the page slice and the unpaginated match count.
    pub fn apply<R, I>(&self, records: I) -> (Vec<R>, i64)
    where
        R: Filterable,
        I: IntoIterator<Item = R>,
    {
        let mut matched: Vec<R> = records
            .into_iter()
            .filter(|r| FilterWhere::matches(&self.table_name, &self.conditions, r))
            .collect();
        let total = matched.len() as i64;

        // Ties fall back to the primary key so repeated page reads stay stable
        matched.sort_by(|a, b| {
            FilterOrder::compare(&self.table_name, &self.order_data, a, b).then_with(|| {
                let left = a.field("id").unwrap_or(FilterValue::Null);
                let right = b.field("id").unwrap_or(FilterValue::Null);
                left.compare(&right)
            })
        });

        let offset = usize::try_from(self.offset.unwrap_or(0).max(0)).unwrap_or(usize::MAX);
        let page: Vec<R> = match self.limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit.max(0) as usize).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };
        (page, total)
    }

    fn build_from_clause(&self) -> Result<String, FilterError> {
        let mut clause = format!("FROM \"{}\"", self.table_name);
        for join in &self.joins {
            if !is_valid_identifier(&join.table) {
                return Err(FilterError::InvalidJoin(join.table.clone()));
            }
            clause.push_str(&format!(
                " JOIN \"{}\" ON {} = {}",
                join.table,
                quote_column(&self.table_name, &join.left)?,
                quote_column(&self.table_name, &join.right)?
            ));
        }
        Ok(clause)
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}
