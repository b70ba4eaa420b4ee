//! Quote-aware scanning of SQL text.
//!
//! The scanner splits SQL into spans that are either outside or inside a quoted
//! literal. Only `'` and `"` open a literal; whichever comes first from the cursor
//! wins. Inside a literal, a quote preceded by an odd number of consecutive
//! backslashes is escaped. An unterminated literal runs to the end of the input.

mod placeholders;
mod prefix;

pub use placeholders::{
    PlaceholderMap, PlaceholderOccurrence, map_placeholders, number_positional_markers,
};
pub use prefix::{PREFIX_TOKEN, rewrite_prefix};

/// Half-open byte range `[start, end)` of a SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn slice<'a>(&self, sql: &'a str) -> &'a str {
        &sql[self.start..self.end]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A span of SQL text tagged with whether it sits inside a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Text outside any quoted literal; safe to rewrite.
    Unquoted(Span),
    /// A quoted literal, quotes included; must be copied verbatim.
    Quoted(Span),
}

impl Segment {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Segment::Unquoted(span) | Segment::Quoted(span) => *span,
        }
    }
}

/// Iterator over the [`Segment`]s of a SQL string, left to right.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    bytes: &'a [u8],
    pos: usize,
    pending_quote: Option<(usize, u8)>,
}

/// Split `sql` into unquoted and quoted segments.
#[must_use]
pub fn segments(sql: &str) -> Segments<'_> {
    Segments {
        bytes: sql.as_bytes(),
        pos: 0,
        pending_quote: None,
    }
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if let Some((open, quote)) = self.pending_quote.take() {
            let end = closing_quote(self.bytes, open, quote).map_or(self.bytes.len(), |k| k + 1);
            self.pos = end;
            return Some(Segment::Quoted(Span { start: open, end }));
        }

        if self.pos >= self.bytes.len() {
            return None;
        }

        let start = self.pos;
        match next_quote(self.bytes, start) {
            Some((open, quote)) => {
                self.pending_quote = Some((open, quote));
                if open == start {
                    self.next()
                } else {
                    self.pos = open;
                    Some(Segment::Unquoted(Span { start, end: open }))
                }
            }
            None => {
                self.pos = self.bytes.len();
                Some(Segment::Unquoted(Span {
                    start,
                    end: self.bytes.len(),
                }))
            }
        }
    }
}

/// Position and character of the nearest `'` or `"` at or after `from`.
#[must_use]
pub fn next_quote(bytes: &[u8], from: usize) -> Option<(usize, u8)> {
    bytes
        .get(from..)?
        .iter()
        .position(|b| *b == b'\'' || *b == b'"')
        .map(|offset| (from + offset, bytes[from + offset]))
}

/// Index of the quote closing the literal opened at `open`, skipping escaped quotes.
///
/// Returns `None` when the literal is never terminated.
#[must_use]
pub fn closing_quote(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut idx = open + 1;
    while idx < bytes.len() {
        let offset = bytes[idx..].iter().position(|b| *b == quote)?;
        let k = idx + offset;
        let mut backslashes = 0;
        while k > backslashes && bytes[k - backslashes - 1] == b'\\' {
            backslashes += 1;
        }
        if backslashes % 2 == 0 {
            return Some(k);
        }
        idx = k + 1;
    }
    None
}

/// Byte offset of the first occurrence of `token` outside any quoted literal.
#[must_use]
pub fn find_unquoted(sql: &str, token: &str) -> Option<usize> {
    if token.is_empty() {
        return None;
    }
    segments(sql).find_map(|segment| match segment {
        Segment::Unquoted(span) => span.slice(sql).find(token).map(|at| span.start + at),
        Segment::Quoted(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(sql: &str) -> Vec<(bool, &str)> {
        segments(sql)
            .map(|s| match s {
                Segment::Unquoted(span) => (false, span.slice(sql)),
                Segment::Quoted(span) => (true, span.slice(sql)),
            })
            .collect()
    }

    #[test]
    fn empty_input_has_no_segments() {
        assert!(collect("").is_empty());
        assert_eq!(find_unquoted("", "#__"), None);
    }

    #[test]
    fn splits_around_single_and_double_quotes() {
        let sql = r#"select 'a', "b" from t"#;
        assert_eq!(
            collect(sql),
            vec![
                (false, "select "),
                (true, "'a'"),
                (false, ", "),
                (true, "\"b\""),
                (false, " from t"),
            ]
        );
    }

    #[test]
    fn nearest_quote_wins() {
        let sql = r#"x = "it's" and y = 'say "hi"'"#;
        assert_eq!(
            collect(sql),
            vec![
                (false, "x = "),
                (true, "\"it's\""),
                (false, " and y = "),
                (true, "'say \"hi\"'"),
            ]
        );
    }

    #[test]
    fn escaped_quotes_do_not_terminate() {
        let sql = r"a = 'O\'Brien' and b = 1";
        assert_eq!(
            collect(sql),
            vec![(false, "a = "), (true, r"'O\'Brien'"), (false, " and b = 1")]
        );
    }

    #[test]
    fn even_backslashes_terminate() {
        let sql = r"a = 'C:\\' and b = :b";
        assert_eq!(
            collect(sql),
            vec![(false, "a = "), (true, r"'C:\\'"), (false, " and b = :b")]
        );
    }

    #[test]
    fn adjacent_empty_literals() {
        let sql = "a = '' and b = ''''";
        assert_eq!(
            collect(sql),
            vec![
                (false, "a = "),
                (true, "''"),
                (false, " and b = "),
                (true, "''"),
                (true, "''"),
            ]
        );
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let sql = "select * from t where a = 'oops #__";
        assert_eq!(
            collect(sql),
            vec![
                (false, "select * from t where a = "),
                (true, "'oops #__"),
            ]
        );
        assert_eq!(find_unquoted(sql, "#__"), None);
    }

    #[test]
    fn finds_token_only_outside_literals() {
        let sql = "select '#__x' from #__users";
        assert_eq!(find_unquoted(sql, "#__"), Some(19));
        assert_eq!(find_unquoted("select '#__x'", "#__"), None);
    }
}
