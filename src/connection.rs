//! Connections hand out [`Statement`]s; connectors (re)open connections.

use crate::error::SqlBridgeError;
use crate::statement::Statement;

/// SQL dialect of a connection: quoting, escaping and catalogue queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    Mysql,
}

impl Dialect {
    /// Character used to quote identifiers.
    #[must_use]
    pub fn name_quote(self) -> char {
        match self {
            Dialect::Sqlite | Dialect::Mysql => '`',
            Dialect::Postgres => '"',
        }
    }

    /// Escape text for inclusion inside a single-quoted literal.
    ///
    /// `SQLite` and `PostgreSQL` double the quote; `MySQL` backslash-escapes quotes,
    /// backslashes and control characters. With `extra`, `%` and `_` are
    /// backslash-escaped for use in `LIKE` patterns.
    #[must_use]
    pub fn escape(self, text: &str, extra: bool) -> String {
        let mut out = String::with_capacity(text.len() + 8);
        for ch in text.chars() {
            match (self, ch) {
                (_, '%' | '_') if extra => {
                    out.push('\\');
                    out.push(ch);
                }
                (Dialect::Sqlite | Dialect::Postgres, '\'') => out.push_str("''"),
                (Dialect::Mysql, '\'' | '"' | '\\') => {
                    out.push('\\');
                    out.push(ch);
                }
                (Dialect::Mysql, '\0') => out.push_str("\\0"),
                (Dialect::Mysql, '\n') => out.push_str("\\n"),
                (Dialect::Mysql, '\r') => out.push_str("\\r"),
                (Dialect::Mysql, '\x1a') => out.push_str("\\Z"),
                _ => out.push(ch),
            }
        }
        out
    }

    /// Statement listing user tables, one name per row.
    #[must_use]
    pub fn table_list_sql(self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
            Dialect::Postgres => {
                "SELECT table_name::text FROM information_schema.tables WHERE table_schema = current_schema() ORDER BY table_name"
            }
            Dialect::Mysql => "SHOW TABLES",
        }
    }

    /// Statement describing the columns of `table`, already quoted as needed.
    ///
    /// Rows carry `name`, `data_type`, `nullable`, `default_value` and `primary_key`.
    #[must_use]
    pub fn table_columns_sql(self, quoted_table: &str, escaped_table: &str) -> String {
        match self {
            Dialect::Sqlite => format!(
                "SELECT name, type AS data_type, CASE WHEN \"notnull\" = 0 THEN 1 ELSE 0 END AS nullable, \
                 dflt_value AS default_value, CASE WHEN pk > 0 THEN 1 ELSE 0 END AS primary_key \
                 FROM pragma_table_info({quoted_table}) ORDER BY cid"
            ),
            Dialect::Postgres => format!(
                "SELECT c.column_name::text AS name, c.data_type::text AS data_type, \
                 CASE WHEN c.is_nullable = 'YES' THEN 1 ELSE 0 END AS nullable, \
                 c.column_default::text AS default_value, \
                 CASE WHEN EXISTS (SELECT 1 FROM information_schema.key_column_usage k \
                 JOIN information_schema.table_constraints tc ON tc.constraint_name = k.constraint_name \
                 AND tc.table_schema = k.table_schema \
                 WHERE tc.constraint_type = 'PRIMARY KEY' AND k.table_name = c.table_name \
                 AND k.table_schema = c.table_schema AND k.column_name = c.column_name) THEN 1 ELSE 0 END AS primary_key \
                 FROM information_schema.columns c \
                 WHERE c.table_schema = current_schema() AND c.table_name = '{escaped_table}' \
                 ORDER BY c.ordinal_position"
            ),
            Dialect::Mysql => format!(
                "SELECT column_name AS name, column_type AS data_type, \
                 CASE WHEN is_nullable = 'YES' THEN 1 ELSE 0 END AS nullable, \
                 column_default AS default_value, \
                 CASE WHEN column_key = 'PRI' THEN 1 ELSE 0 END AS primary_key \
                 FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = '{escaped_table}' \
                 ORDER BY ordinal_position"
            ),
        }
    }

    #[must_use]
    pub fn truncate_sql(self, quoted_table: &str) -> String {
        match self {
            Dialect::Sqlite => format!("DELETE FROM {quoted_table}"),
            Dialect::Postgres | Dialect::Mysql => format!("TRUNCATE TABLE {quoted_table}"),
        }
    }

    #[must_use]
    pub fn rename_sql(self, quoted_old: &str, quoted_new: &str) -> String {
        match self {
            Dialect::Mysql => format!("RENAME TABLE {quoted_old} TO {quoted_new}"),
            Dialect::Sqlite | Dialect::Postgres => {
                format!("ALTER TABLE {quoted_old} RENAME TO {quoted_new}")
            }
        }
    }

    /// Query used to check that a connection still answers.
    #[must_use]
    pub fn ping_sql(self) -> &'static str {
        "SELECT 1"
    }
}

/// An open connection to a database.
pub trait Connection {
    fn dialect(&self) -> Dialect;

    /// Prepare `sql` (prefix already rewritten) as a [`Statement`].
    ///
    /// # Errors
    /// Returns [`SqlBridgeError::PrepareOrBindFailure`] when the driver rejects the text.
    fn prepare(&self, sql: &str) -> Result<Statement, SqlBridgeError>;

    /// Dedicated liveness check; never re-runs application SQL.
    fn ping(&self) -> bool;

    /// Row id generated by the last insert on this connection.
    ///
    /// # Errors
    /// Returns the driver's error when the id cannot be read.
    fn last_insert_id(&self) -> Result<i64, SqlBridgeError>;
}

/// Opens connections; called again to reconnect after the ping reports a dead link.
pub trait Connector {
    /// # Errors
    /// Returns [`SqlBridgeError::ConnectionError`] when no connection can be made.
    fn connect(&self) -> Result<Box<dyn Connection>, SqlBridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_like_wildcards() {
        assert_eq!(Dialect::Sqlite.escape("O'Brien", false), "O''Brien");
        assert_eq!(Dialect::Postgres.escape("50%_off", true), "50\\%\\_off");
        assert_eq!(Dialect::Postgres.escape("50%_off", false), "50%_off");
    }

    #[test]
    fn nul_bytes_pass_through_quote_doubling_dialects() {
        assert_eq!(Dialect::Sqlite.escape("a\0b", false), "a\0b");
        assert_eq!(Dialect::Postgres.escape("a\0b", false), "a\0b");
    }

    #[test]
    fn mysql_escapes_with_backslashes() {
        assert_eq!(Dialect::Mysql.escape("O'Brien", false), "O\\'Brien");
        assert_eq!(
            Dialect::Mysql.escape("a\\b\n\0\"", false),
            "a\\\\b\\n\\0\\\""
        );
        assert_eq!(Dialect::Mysql.escape("5%_", true), "5\\%\\_");
        assert_eq!(Dialect::Mysql.name_quote(), '`');
        assert_eq!(Dialect::Mysql.table_list_sql(), "SHOW TABLES");
        assert_eq!(Dialect::Mysql.truncate_sql("`t`"), "TRUNCATE TABLE `t`");
        assert_eq!(Dialect::Mysql.rename_sql("`a`", "`b`"), "RENAME TABLE `a` TO `b`");
        assert!(
            Dialect::Mysql
                .table_columns_sql("`t`", "t")
                .contains("table_schema = DATABASE() AND table_name = 't'")
        );
    }

    #[test]
    fn truncate_differs_per_dialect() {
        assert_eq!(Dialect::Sqlite.truncate_sql("`t`"), "DELETE FROM `t`");
        assert_eq!(Dialect::Postgres.truncate_sql("\"t\""), "TRUNCATE TABLE \"t\"");
    }
}
