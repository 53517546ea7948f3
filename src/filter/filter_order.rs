use std::cmp::Ordering;

use super::error::FilterError;
use super::filter_where::{quote_column, unqualify};
use super::types::{FilterOrderInfo, Filterable, FilterValue, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(table: &str, infos: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if infos.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(infos.len());
        for info in infos {
            let nulls = if info.nulls_last { " NULLS LAST" } else { "" };
            parts.push(format!("{} {}{}", quote_column(table, &info.column)?, info.sort.to_sql(), nulls));
        }
        // Primary key breaks ties so pages never overlap
        parts.push(quote_column(table, "id")?);
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    /// Compare two records using the same ordering the SQL rendering would apply
    pub fn compare<R: Filterable>(table: &str, infos: &[FilterOrderInfo], a: &R, b: &R) -> Ordering {
        for info in infos {
            let column = unqualify(table, &info.column);
            let left = a.field(column).unwrap_or(FilterValue::Null);
            let right = b.field(column).unwrap_or(FilterValue::Null);

            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                // Postgres default: NULLS LAST for ASC, NULLS FIRST for DESC
                (true, false) if info.nulls_last => Ordering::Greater,
                (false, true) if info.nulls_last => Ordering::Less,
                _ => match info.sort {
                    SortDirection::Asc => left.compare(&right),
                    SortDirection::Desc => right.compare(&left),
                },
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
