//! Lexical read/write classification of SQL statements.
//!
//! A statement is a read when its trimmed, lowercased text starts with a read keyword.
//! This is a prefix test, not a tokenizer: `describe t` and `selectx` both count as reads,
//! while comment-prefixed or CTE statements are writes.

/// Prefixes that route a statement to the row-returning path.
pub const READ_KEYWORDS: &[&str] = &["select", "show", "desc"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let sql = sql.trim().to_lowercase();
        if READ_KEYWORDS.iter().any(|kw| sql.starts_with(kw)) {
            StatementKind::Read
        } else {
            StatementKind::Write
        }
    }
}
