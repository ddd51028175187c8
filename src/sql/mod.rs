pub mod classify;
pub mod decode;
pub mod value;

pub use classify::{StatementKind, READ_KEYWORDS};
pub use decode::pg_row_to_row;
pub use value::{Row, SqlValue};
