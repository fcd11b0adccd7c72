//! SQL composition: statements, caller fragments and placeholder numbering.
//!
//! - [`Fragment`] is what callers hand in: a piece of SQL using `?` placeholders plus the
//!   values for them, e.g. `WHERE age > ? ORDER BY id`.
//! - [`Sql`] is the internal builder. It stores raw pieces and parameters separately and
//!   renders `$1, $2, ...` in order, so generated arguments always precede fragment arguments.
//! - [`Statement`] is the frozen result handed to the execution layer.
//!
//! # Example
//!
//! ```ignore
//! use pgdao::{fragment, Fragment};
//!
//! let adults = fragment!("WHERE age >= ? AND name LIKE ?", 18, "A%");
//! let literal = Fragment::new("WHERE tags ?? 'rust'"); // `??` is a literal `?`
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::Param;
use std::fmt::Write;
use tokio_postgres::types::ToSql;

/// Validate a bare SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic()) && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Strip leading whitespace and SQL comments (`--` and `/* */`).
fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if s == before {
            break;
        }
    }
    s
}

/// If `sql` starts with `keyword` (case-insensitive, whole word), return the remainder.
pub(crate) fn strip_leading_keyword<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let s = strip_sql_prefix(sql);
    let prefix = s.get(0..keyword.len())?;
    if !prefix.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == '(' || c == '-' || c == '/' => Some(rest),
        Some(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Raw(String),
    Placeholder,
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Copy a quoted run starting at `start` (the opening quote) and return the index after it.
///
/// With `backslash_escapes` (an `E'...'` string) the character after `\` never closes it.
fn copy_quoted(
    chars: &[char],
    start: usize,
    quote: char,
    backslash_escapes: bool,
    raw: &mut String,
) -> usize {
    raw.push(chars[start]);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        raw.push(c);
        i += 1;
        if backslash_escapes && c == '\\' {
            if let Some(&escaped) = chars.get(i) {
                raw.push(escaped);
                i += 1;
            }
        } else if c == quote {
            return i;
        }
    }
    i
}

/// Length of a `$tag$` / `$$` opener at `start`, if there is one.
fn dollar_tag_len(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    match chars.get(i) {
        Some('$') => return Some(2),
        Some(&c) if c == '_' || c.is_alphabetic() => {}
        _ => return None,
    }
    while let Some(&c) = chars.get(i) {
        if c == '$' {
            return Some(i + 1 - start);
        }
        if !is_word_char(c) {
            return None;
        }
        i += 1;
    }
    None
}

/// Split SQL into raw text and `?` placeholders.
///
/// `?` inside string literals (plain, `E'...'` and dollar-quoted), quoted identifiers and
/// comments is left alone; `??` is an escaped literal `?`.
fn split_placeholders(sql: &str) -> Vec<Piece> {
    let chars: Vec<char> = sql.chars().collect();
    let mut pieces = Vec::new();
    let mut raw = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let after_word = i > 0 && is_word_char(chars[i - 1]);
        match c {
            '?' if next == Some('?') => {
                raw.push('?');
                i += 2;
            }
            '?' => {
                if !raw.is_empty() {
                    pieces.push(Piece::Raw(std::mem::take(&mut raw)));
                }
                pieces.push(Piece::Placeholder);
                i += 1;
            }
            '\'' | '"' => i = copy_quoted(&chars, i, c, false, &mut raw),
            'E' | 'e' if !after_word && next == Some('\'') => {
                raw.push(c);
                i = copy_quoted(&chars, i + 1, '\'', true, &mut raw);
            }
            '-' if next == Some('-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p + 1);
                raw.extend(&chars[i..end]);
                i = end;
            }
            '/' if next == Some('*') => {
                let end = chars[i + 2..]
                    .windows(2)
                    .position(|w| w == ['*', '/'])
                    .map_or(chars.len(), |p| i + 2 + p + 2);
                raw.extend(&chars[i..end]);
                i = end;
            }
            '$' if !after_word => match dollar_tag_len(&chars, i) {
                Some(len) => {
                    let tag = &chars[i..i + len];
                    let body = i + len;
                    let end = chars[body..]
                        .windows(len)
                        .position(|w| w == tag)
                        .map_or(chars.len(), |p| body + p + len);
                    raw.extend(&chars[i..end]);
                    i = end;
                }
                None => {
                    raw.push(c);
                    i += 1;
                }
            },
            _ => {
                raw.push(c);
                i += 1;
            }
        }
    }
    if !raw.is_empty() {
        pieces.push(Piece::Raw(raw));
    }
    pieces
}

/// Count the `?` placeholders in a SQL string.
pub fn count_placeholders(sql: &str) -> usize {
    split_placeholders(sql)
        .iter()
        .filter(|p| matches!(p, Piece::Placeholder))
        .count()
}

/// A caller-supplied SQL fragment with its own positional arguments.
///
/// Used as a filter/ordering suffix (`WHERE ... ORDER BY ...`), as the predicate of a
/// conditional insert or delete, and as the full text of passthrough queries.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    sql: String,
    args: Vec<Param>,
}

impl Fragment {
    /// Create a fragment without arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Bind the next `?` (chainable).
    pub fn bind<T>(mut self, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.args.push(Param::new(value));
        self
    }

    /// Bind the next `?` to an optional value (`None` binds `NULL`).
    pub fn bind_option<T>(mut self, value: Option<T>) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.args.push(Param::from_option(value));
        self
    }

    /// Bind the next `?` to a prepared [`Param`].
    pub fn bind_param(mut self, param: Param) -> Self {
        self.args.push(param);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Param] {
        &self.args
    }

    /// Whether the fragment contains no SQL besides whitespace and comments.
    pub fn is_blank(&self) -> bool {
        strip_sql_prefix(&self.sql).is_empty()
    }

    /// Check that the number of `?` placeholders matches the bound arguments.
    pub fn validate(&self) -> OrmResult<()> {
        let placeholders = count_placeholders(&self.sql);
        if placeholders != self.args.len() {
            return Err(OrmError::precondition(format!(
                "fragment has {} placeholder(s) but {} argument(s): {}",
                placeholders,
                self.args.len(),
                self.sql
            )));
        }
        Ok(())
    }
}

impl From<&str> for Fragment {
    fn from(sql: &str) -> Self {
        Fragment::new(sql)
    }
}

impl From<String> for Fragment {
    fn from(sql: String) -> Self {
        Fragment::new(sql)
    }
}

/// Build a [`Fragment`] from SQL with `?` placeholders and its arguments.
///
/// ```ignore
/// let f = pgdao::fragment!("WHERE status = ? AND age > ?", "active", 18);
/// ```
#[macro_export]
macro_rules! fragment {
    ($sql:expr $(,)?) => {
        $crate::Fragment::new($sql)
    };
    ($sql:expr, $($arg:expr),+ $(,)?) => {
        $crate::Fragment::new($sql)$(.bind($arg))+
    };
}

#[derive(Debug)]
enum SqlPart {
    Raw(String),
    Param,
}

/// Internal statement builder generating `$n` placeholders in order.
#[derive(Debug, Default)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Param>,
}

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.push_param(Param::new(value))
    }

    /// Append a placeholder for an already wrapped parameter.
    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(param);
        self
    }

    /// Append a comma-separated list of placeholders.
    pub fn push_param_list<'a>(&mut self, params: impl IntoIterator<Item = &'a Param>) -> &mut Self {
        for (i, p) in params.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_param(p.clone());
        }
        self
    }

    /// Append a caller fragment, turning each `?` into the next `$n`.
    pub fn push_fragment(&mut self, fragment: &Fragment) -> OrmResult<&mut Self> {
        self.push_fragment_text(fragment.sql(), fragment)
    }

    /// Append `text` (a suffix of `fragment`'s SQL that keeps all of its placeholders) using
    /// `fragment`'s arguments.
    pub(crate) fn push_fragment_text(
        &mut self,
        text: &str,
        fragment: &Fragment,
    ) -> OrmResult<&mut Self> {
        fragment.validate()?;
        let mut args = fragment.args().iter();
        for piece in split_placeholders(text) {
            match piece {
                Piece::Raw(raw) => {
                    self.push(&raw);
                }
                Piece::Placeholder => {
                    let arg = args.next().ok_or_else(|| {
                        OrmError::precondition(format!(
                            "fragment placeholder without argument: {}",
                            fragment.sql()
                        ))
                    })?;
                    self.push_param(arg.clone());
                }
            }
        }
        Ok(self)
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    let _ = write!(&mut out, "${}", idx);
                }
            }
        }
        out
    }

    /// Number of bound parameters so far.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Freeze into an executable statement.
    pub fn build(self) -> Statement {
        Statement {
            sql: self.to_sql(),
            params: self.params,
        }
    }
}

/// SQL text with positional placeholders plus its ordered arguments.
///
/// Built fresh for every call and never shared.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    params: Vec<Param>,
}

impl Statement {
    /// Build a statement from a complete caller-written fragment.
    pub fn from_fragment(fragment: &Fragment) -> OrmResult<Self> {
        let mut q = Sql::empty();
        q.push_fragment(fragment)?;
        Ok(q.build())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(Param::as_sql).collect()
    }
}
