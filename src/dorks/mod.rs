//! Parsing of the sectioned dork-file format.
//!
//! A dork file groups search-query templates under `[Category]` headers:
//!
//! ```text
//! # comment lines and blank lines are ignored
//! [Exposed Documents]
//! site:example.com filetype:pdf
//! site:example.com filetype:xls
//!
//! [Login Pages]
//! site:example.com inurl:login
//! ```
//!
//! Templates that appear before any header fall into an implicit
//! `Uncategorized` bucket. Category order and template order within a
//! category follow the file.

mod error;
mod parser;

pub use error::DorkError;
pub use parser::{DorkSet, UNCATEGORIZED};
