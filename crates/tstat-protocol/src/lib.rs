//! Wire protocol for the tstat monitor service.
//!
//! ASCII tokens separated by whitespace, commas, or equals signs flow
//! client to server; the server answers with unframed `SERVER> ...`
//! strings. This crate owns the tokenizer and command grammar as well as
//! the response rendering, so the daemon and the tests agree on exact
//! bytes.

pub mod command;
pub mod response;

pub use command::{parse_line, Command, QueryTarget};
pub use response::{Response, RESPONSE_PREFIX};
