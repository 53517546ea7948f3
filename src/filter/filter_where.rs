use super::error::FilterError;
use super::types::{FilterOp, FilterValue, FilterWhereInfo, Filterable};

pub struct FilterWhere {
    param_values: Vec<FilterValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Render `conditions` as an AND-joined clause with `$n` placeholders.
    /// An empty condition list renders as `1=1`.
    pub fn generate(
        table: &str,
        conditions: &[FilterWhereInfo],
        starting_param_index: usize,
    ) -> Result<(String, Vec<FilterValue>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for condition in conditions {
            sql_conditions.push(filter_where.build_sql_condition(table, condition)?);
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, filter_where.param_values))
    }

    /// Evaluate the same predicate against an in-memory record
    pub fn matches<R: Filterable>(table: &str, conditions: &[FilterWhereInfo], record: &R) -> bool {
        conditions.iter().all(|condition| {
            let column = unqualify(table, &condition.column);
            let Some(value) = record.field(column) else {
                return false;
            };
            match condition.operator {
                FilterOp::Eq if condition.data.is_null() => value.is_null(),
                FilterOp::Eq => value == condition.data,
                FilterOp::Like => match (&value, &condition.data) {
                    (FilterValue::Text(haystack), FilterValue::Text(needle)) => haystack.contains(needle.as_str()),
                    _ => false,
                },
            }
        })
    }

    fn build_sql_condition(&mut self, table: &str, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = quote_column(table, &condition.column)?;
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    Ok(format!("{} IS NULL", quoted_column))
                } else {
                    Ok(format!("{} = {}", quoted_column, self.param(condition.data.clone())))
                }
            }
            FilterOp::Like => {
                let pattern = match &condition.data {
                    FilterValue::Text(text) => FilterValue::Text(format!("%{}%", escape_like(text))),
                    other => other.clone(),
                };
                Ok(format!("{} LIKE {} ESCAPE '\\'", quoted_column, self.param(pattern)))
            }
        }
    }

    fn param(&mut self, value: FilterValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Strip the `table.` prefix when the column belongs to the filtered table itself
pub fn unqualify<'a>(table: &str, column: &'a str) -> &'a str {
    match column.split_once('.') {
        Some((prefix, rest)) if prefix == table => rest,
        _ => column,
    }
}

/// Quote a bare or `table.column` identifier, defaulting to `table`
pub fn quote_column(table: &str, column: &str) -> Result<String, FilterError> {
    let (owner, name) = column.split_once('.').unwrap_or((table, column));
    if !is_valid_identifier(owner) || !is_valid_identifier(name) {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
    }
    Ok(format!("\"{}\".\"{}\"", owner, name))
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Literal substring pattern: wildcards and the escape character match themselves
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: &'static str,
        grade: i64,
    }

    impl Filterable for Row {
        fn field(&self, column: &str) -> Option<FilterValue> {
            match column {
                "name" => Some(FilterValue::from(self.name)),
                "grade" => Some(FilterValue::Int(self.grade)),
                _ => None,
            }
        }
    }

    fn info(column: &str, operator: FilterOp, data: FilterValue) -> FilterWhereInfo {
        FilterWhereInfo { column: column.to_string(), operator, data }
    }

    #[test]
    fn renders_placeholders_in_order() {
        let conditions = vec![
            info("course_name", FilterOp::Like, "alg".into()),
            info("grade_level", FilterOp::Eq, 7.into()),
        ];
        let (sql, params) = FilterWhere::generate("courses", &conditions, 0).unwrap();
        assert_eq!(
            sql,
            "\"courses\".\"course_name\" LIKE $1 ESCAPE '\\' AND \"courses\".\"grade_level\" = $2"
        );
        assert_eq!(params, vec![FilterValue::Text("%alg%".into()), FilterValue::Int(7)]);
    }

    #[test]
    fn like_wildcards_are_literal() {
        let conditions = vec![info("course_name", FilterOp::Like, "50%_off\\".into())];
        let (_, params) = FilterWhere::generate("courses", &conditions, 0).unwrap();
        assert_eq!(params, vec![FilterValue::Text("%50\\%\\_off\\\\%".into())]);

        let row = Row { name: "Sale 50%_off\\ today", grade: 1 };
        assert!(FilterWhere::matches("rows", &[info("name", FilterOp::Like, "50%_off\\".into())], &row));
        let plain = Row { name: "Sale 50 off", grade: 1 };
        assert!(!FilterWhere::matches("rows", &[info("name", FilterOp::Like, "50%".into())], &plain));
    }

    #[test]
    fn empty_conditions_render_tautology() {
        let (sql, params) = FilterWhere::generate("subjects", &[], 0).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_injected_column_names() {
        let conditions = vec![info("name; DROP TABLE users", FilterOp::Eq, "x".into())];
        assert!(FilterWhere::generate("users", &conditions, 0).is_err());
    }

    #[test]
    fn matches_records_in_memory() {
        let row = Row { name: "Algebra I", grade: 7 };
        let like = vec![info("rows.name", FilterOp::Like, "gebra".into())];
        assert!(FilterWhere::matches("rows", &like, &row));

        let wrong_grade = vec![info("grade", FilterOp::Eq, 8.into())];
        assert!(!FilterWhere::matches("rows", &wrong_grade, &row));

        let unknown = vec![info("missing", FilterOp::Eq, 1.into())];
        assert!(!FilterWhere::matches("rows", &unknown, &row));
    }
}
