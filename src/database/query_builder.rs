use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgConnection, Postgres, Row};

use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FilterValue};

/// Executes a `Filter` against a Postgres connection
pub struct QueryBuilder<'f, T> {
    filter: &'f Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<'f, T> QueryBuilder<'f, T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(filter: &'f Filter) -> Self {
        Self {
            filter,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all(&self, conn: &mut PgConnection) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(&mut *conn).await?)
    }

    pub async fn count(&self, conn: &mut PgConnection) -> Result<i64, DatabaseError> {
        let sql_result = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&mut *conn).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    /// Page of rows plus the unpaginated count
    pub async fn select_page(&self, conn: &mut PgConnection) -> Result<(Vec<T>, i64), DatabaseError> {
        let rows = self.select_all(conn).await?;
        let total = self.count(conn).await?;
        Ok((rows, total))
    }
}

/// `SELECT * FROM table WHERE id = ANY($1)`
pub async fn select_ids<T>(conn: &mut PgConnection, table: &str, ids: Vec<uuid::Uuid>) -> Result<Vec<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let query = format!("SELECT * FROM \"{}\" WHERE \"id\" = ANY($1)", table);
    Ok(sqlx::query_as::<_, T>(&query).bind(ids).fetch_all(&mut *conn).await?)
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        FilterValue::Null => q.bind(None::<String>),
        FilterValue::Text(s) => q.bind(s.as_str()),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Uuid(u) => q.bind(*u),
        FilterValue::Date(d) => q.bind(*d),
        FilterValue::Timestamp(t) => q.bind(*t),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        FilterValue::Null => q.bind(None::<String>),
        FilterValue::Text(s) => q.bind(s.as_str()),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Uuid(u) => q.bind(*u),
        FilterValue::Date(d) => q.bind(*d),
        FilterValue::Timestamp(t) => q.bind(*t),
    }
}
