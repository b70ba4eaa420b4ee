use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Segment, segments};

lazy_static! {
    static ref NAMED_PLACEHOLDER: Regex = Regex::new(r":([A-Za-z0-9_]+)").expect("valid regex");
}

/// One named marker found in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderOccurrence {
    /// Name without the leading colon.
    pub name: String,
    /// Zero-based ordinal among all markers, left to right.
    pub position: usize,
}

/// SQL rewritten to positional markers plus the name→position occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaceholderMap {
    sql: String,
    occurrences: Vec<PlaceholderOccurrence>,
}

impl PlaceholderMap {
    /// A mapping that leaves the SQL untouched.
    #[must_use]
    pub fn identity(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            occurrences: Vec::new(),
        }
    }

    /// The rewritten SQL (unchanged when no placeholder was found).
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn occurrences(&self) -> &[PlaceholderOccurrence] {
        &self.occurrences
    }

    /// Number of positional markers emitted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Every position occupied by `name` (with or without the leading colon).
    pub fn positions_of<'a>(&'a self, name: &str) -> impl Iterator<Item = usize> + 'a {
        let name = name.strip_prefix(':').unwrap_or(name).to_string();
        self.occurrences
            .iter()
            .filter(move |occ| occ.name == name)
            .map(|occ| occ.position)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.positions_of(name).next().is_some()
    }

    /// Distinct names in order of first appearance.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for occ in &self.occurrences {
            if !names.contains(&occ.name.as_str()) {
                names.push(&occ.name);
            }
        }
        names
    }

    /// Keep `sql` as written while remembering the scanned occurrences.
    pub(crate) fn with_sql(sql: &str, occurrences: Vec<PlaceholderOccurrence>) -> Self {
        Self {
            sql: sql.to_string(),
            occurrences,
        }
    }
}

/// Replace every unquoted `:name` marker with `?` and record where each name went.
///
/// Literals are never scanned, so `'cost is :not_a_param'` stays as written. A `::`
/// pair is a cast, not a marker. When nothing matches, the SQL is returned as-is
/// with an empty mapping.
///
/// ```rust
/// use sql_bridge::scanner::map_placeholders;
///
/// let map = map_placeholders("SELECT * FROM t WHERE a = :id OR b = :id AND c = ':id'");
/// assert_eq!(map.sql(), "SELECT * FROM t WHERE a = ? OR b = ? AND c = ':id'");
/// assert_eq!(map.positions_of("id").collect::<Vec<_>>(), vec![0, 1]);
/// ```
#[must_use]
pub fn map_placeholders(sql: &str) -> PlaceholderMap {
    if !NAMED_PLACEHOLDER.is_match(sql) {
        return PlaceholderMap::identity(sql);
    }

    let mut out = String::with_capacity(sql.len());
    let mut occurrences = Vec::new();

    for segment in segments(sql) {
        match segment {
            Segment::Quoted(span) => out.push_str(span.slice(sql)),
            Segment::Unquoted(span) => {
                let text = span.slice(sql);
                let mut copied = 0;
                for caps in NAMED_PLACEHOLDER.captures_iter(text) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    if is_cast(text.as_bytes(), whole.start()) {
                        continue;
                    }
                    out.push_str(&text[copied..whole.start()]);
                    out.push('?');
                    occurrences.push(PlaceholderOccurrence {
                        name: name.as_str().to_string(),
                        position: occurrences.len(),
                    });
                    copied = whole.end();
                }
                out.push_str(&text[copied..]);
            }
        }
    }

    if occurrences.is_empty() {
        return PlaceholderMap::identity(sql);
    }

    PlaceholderMap {
        sql: out,
        occurrences,
    }
}

fn is_cast(bytes: &[u8], colon: usize) -> bool {
    colon > 0 && bytes[colon - 1] == b':'
}

/// Number bare `?` markers outside literals as `$1..$n`, the form `PostgreSQL` expects.
#[must_use]
pub fn number_positional_markers(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out: Option<String> = None;
    let mut next = 1;
    for segment in segments(sql) {
        match segment {
            Segment::Quoted(span) => {
                if let Some(buf) = out.as_mut() {
                    buf.push_str(span.slice(sql));
                }
            }
            Segment::Unquoted(span) => {
                for (offset, ch) in span.slice(sql).char_indices() {
                    if ch == '?' {
                        let buf = out.get_or_insert_with(|| sql[..span.start + offset].to_string());
                        buf.push('$');
                        buf.push_str(&next.to_string());
                        next += 1;
                    } else if let Some(buf) = out.as_mut() {
                        buf.push(ch);
                    }
                }
            }
        }
    }

    match out {
        Some(buf) => Cow::Owned(buf),
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_distinct_names_in_order() {
        let map = map_placeholders("INSERT INTO t (a, b, c) VALUES (:a, :b_2, :C)");
        assert_eq!(map.sql(), "INSERT INTO t (a, b, c) VALUES (?, ?, ?)");
        assert_eq!(map.len(), 3);
        let names: Vec<_> = map.occurrences().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b_2", "C"]);
        assert_eq!(map.positions_of(":b_2").collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn repeated_names_take_every_position() {
        let map = map_placeholders("SELECT * FROM t WHERE x = :v OR y = :w OR z = :v");
        assert_eq!(map.positions_of("v").collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(map.positions_of("w").collect::<Vec<_>>(), vec![1]);
        assert_eq!(map.names(), vec!["v", "w"]);
    }

    #[test]
    fn literal_placeholders_are_untouched() {
        let sql = "SELECT 'cost is :not_a_param' AS note, \"x:y\" FROM t WHERE id = :id";
        let map = map_placeholders(sql);
        assert_eq!(
            map.sql(),
            "SELECT 'cost is :not_a_param' AS note, \"x:y\" FROM t WHERE id = ?"
        );
        assert_eq!(map.len(), 1);
        assert!(!map.contains("not_a_param"));
    }

    #[test]
    fn no_placeholders_returns_input() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ':quoted'";
        let map = map_placeholders(sql);
        assert!(map.is_empty());
        assert_eq!(map.sql(), sql);
    }

    #[test]
    fn casts_are_not_placeholders() {
        let map = map_placeholders("SELECT :n::int, created_at::date FROM t");
        assert_eq!(map.sql(), "SELECT ?::int, created_at::date FROM t");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn numbers_positional_markers() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?";
        assert_eq!(
            number_positional_markers(sql),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND c = $2"
        );
        let plain = "SELECT 1";
        assert!(matches!(number_positional_markers(plain), Cow::Borrowed(_)));
    }
}
