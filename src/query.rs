use crate::params::{BoundParams, ParamKey, Parameter};
use crate::types::{ParamType, SqlValue};

/// A SQL string with its bound parameters and optional row window.
///
/// The window is appended as `LIMIT`/`OFFSET` when the query is rendered:
/// ```rust
/// use sql_bridge::prelude::*;
///
/// let mut query = Query::new("SELECT * FROM #__users WHERE name = :name");
/// query.bind("name", "O'Brien", ParamType::Str).set_limit(10, 20);
/// assert_eq!(
///     query.to_sql(),
///     "SELECT * FROM #__users WHERE name = :name LIMIT 10 OFFSET 20"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    sql: String,
    bound: BoundParams,
    limit: usize,
    offset: usize,
}

impl Query {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// The SQL as given, without the row window.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The SQL with `LIMIT`/`OFFSET` appended when a limit is set.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match (self.limit, self.offset) {
            (0, _) => self.sql.clone(),
            (limit, 0) => format!("{} LIMIT {limit}", self.sql),
            (limit, offset) => format!("{} LIMIT {limit} OFFSET {offset}", self.sql),
        }
    }

    /// Restrict the result to `limit` rows starting at `offset`; a zero limit clears it.
    pub fn set_limit(&mut self, limit: usize, offset: usize) -> &mut Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn bind(
        &mut self,
        key: impl Into<ParamKey>,
        value: impl Into<SqlValue>,
        param_type: ParamType,
    ) -> &mut Self {
        self.bound.bind(key, value, param_type);
        self
    }

    pub fn bind_param(&mut self, param: Parameter) -> &mut Self {
        self.bound.bind_param(param);
        self
    }

    /// Bind every `(key, value)` pair with the same logical type.
    pub fn bind_array<K, V, I>(&mut self, values: I, param_type: ParamType) -> &mut Self
    where
        K: Into<ParamKey>,
        V: Into<SqlValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.bound.bind_array(values, param_type);
        self
    }

    pub fn unbind(&mut self, key: impl Into<ParamKey>) -> &mut Self {
        self.bound.unbind(key);
        self
    }

    #[must_use]
    pub fn bound(&self) -> &BoundParams {
        &self.bound
    }

    pub fn clear_bound(&mut self) {
        self.bound.clear();
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Query::new(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Query::new(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_without_offset() {
        let mut query = Query::new("SELECT 1");
        query.set_limit(5, 0);
        assert_eq!(query.to_sql(), "SELECT 1 LIMIT 5");
        query.set_limit(0, 7);
        assert_eq!(query.to_sql(), "SELECT 1");
    }

    #[test]
    fn binding_overwrites_by_key() {
        let mut query = Query::new("SELECT :a");
        query.bind("a", 1, ParamType::Int).bind(":a", 2, ParamType::Int);
        assert_eq!(query.bound().len(), 1);
        assert_eq!(
            query.bound().get(&ParamKey::named("a")).map(|p| p.value.clone()),
            Some(SqlValue::Int(2))
        );
    }
}
