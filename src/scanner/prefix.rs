use std::borrow::Cow;

use super::{Segment, find_unquoted, segments};

/// Table-prefix token substituted by [`rewrite_prefix`].
pub const PREFIX_TOKEN: &str = "#__";

/// Replace every unquoted [`PREFIX_TOKEN`] with `prefix`.
///
/// Literals are copied verbatim, including any `#__` inside them. An unterminated
/// trailing literal is copied through unmodified. Returns a borrowed `Cow` when the
/// token does not occur outside a literal.
///
/// ```rust
/// use sql_bridge::scanner::rewrite_prefix;
///
/// let sql = "SELECT * FROM #__users WHERE note = 'see #__users'";
/// assert_eq!(
///     rewrite_prefix(sql, "app_"),
///     "SELECT * FROM app_users WHERE note = 'see #__users'"
/// );
/// ```
#[must_use]
pub fn rewrite_prefix<'a>(sql: &'a str, prefix: &str) -> Cow<'a, str> {
    if find_unquoted(sql, PREFIX_TOKEN).is_none() {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + prefix.len() * 4);
    for segment in segments(sql) {
        match segment {
            Segment::Unquoted(span) => out.push_str(&span.slice(sql).replace(PREFIX_TOKEN, prefix)),
            Segment::Quoted(span) => out.push_str(span.slice(sql)),
        }
    }
    Cow::Owned(out)
}
