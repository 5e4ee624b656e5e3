//! Statement representation used between rendering and serialisation
//!
//! A statement is an ordered list of fragments. Bound values are kept as
//! fragments of their own, so rewrites that drop or move a value drop or
//! move its placeholder with it. Placeholder numbers only come into
//! existence in [`Statement::finish`].

use super::dialects::SqlDialect;
use crate::database::types::SqlValue;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Literal SQL text
    Sql(String),
    /// A bound argument, serialised as the dialect's placeholder
    Param(SqlValue),
    /// Comparison operator of a regex predicate on `field`, resolved per dialect
    RegexOperator { field: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    fragments: Vec<Fragment>,
}

/// Final SQL text and the arguments for its placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl RenderedStatement {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sql(text: impl Into<String>) -> Self {
        let mut stmt = Self::new();
        stmt.push_sql(text);
        stmt
    }

    pub fn push_sql(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        // Merge adjacent text so rewrites see whole tokens
        if let Some(Fragment::Sql(last)) = self.fragments.last_mut() {
            last.push_str(&text);
        } else {
            self.fragments.push(Fragment::Sql(text));
        }
        self
    }

    /// Push an identifier with any quoting characters removed
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        self.push_sql(strip_quotes(name))
    }

    pub fn push_param(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.fragments.push(Fragment::Param(value.into()));
        self
    }

    pub fn push_regex_operator(&mut self, field: &str) -> &mut Self {
        self.fragments.push(Fragment::RegexOperator {
            field: strip_quotes(field),
        });
        self
    }

    pub fn append(&mut self, other: Statement) -> &mut Self {
        for fragment in other.fragments {
            match fragment {
                Fragment::Sql(text) => {
                    self.push_sql(text);
                }
                other => self.fragments.push(other),
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub(crate) fn fragments_mut(&mut self) -> &mut Vec<Fragment> {
        &mut self.fragments
    }

    pub fn param_count(&self) -> usize {
        self.fragments
            .iter()
            .filter(|f| matches!(f, Fragment::Param(_)))
            .count()
    }

    /// Serialise to text, numbering placeholders in order of appearance
    ///
    /// Fails if a regex operator was never resolved for the dialect.
    pub fn finish(self, dialect: &dyn SqlDialect) -> Result<RenderedStatement> {
        let mut sql = String::new();
        let mut args = Vec::with_capacity(self.param_count());

        for fragment in self.fragments {
            match fragment {
                Fragment::Sql(text) => sql.push_str(&text),
                Fragment::Param(value) => {
                    args.push(value);
                    sql.push_str(&dialect.placeholder(args.len()));
                }
                Fragment::RegexOperator { field } => {
                    return Err(Error::unsupported(
                        dialect.backend(),
                        format!("unresolved $regex on field {}", field),
                    ));
                }
            }
        }

        Ok(RenderedStatement { sql, args })
    }
}

/// Remove identifier quoting (`"x"`, `` `x` ``, `[x]`)
pub fn strip_quotes(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '`' | '[' | ']'))
        .collect()
}
