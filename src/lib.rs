//! Parse `.env` style `KEY=VALUE` lines into an ordered map.
//!
//! The parser works one line at a time: comment lines are dropped, a leading
//! `export` is stripped, the line is split on the first `=`, trailing `#`
//! comments are removed from unquoted values, quoted values are unescaped and
//! `$NAME` references are substituted from earlier lines or the host
//! environment.
//!
//! Parsing never fails. Lines that cannot be understood are skipped and
//! reported through [`Parser::parse_lines_with_diagnostics`].
//!
//! ```
//! use dotvars::{ParseOptions, parse_str};
//!
//! let vars = parse_str("export A=1\nB=\"$A two\" # note\n", ParseOptions::default());
//! assert_eq!(vars.get("B"), Some("1 two"));
//! ```

mod env;
mod error;
mod model;
mod parser;
mod substitution;
mod unescape;
mod vars;

pub use env::{EnvLookup, HostEnv};
pub use error::{Diagnostic, DiagnosticKind, Error};
pub use model::{DEFAULT_MAX_SUBSTITUTIONS, Entry, ParseOptions};
pub use parser::{Parsed, Parser, parse_bytes, parse_lines, parse_reader, parse_str};
pub use unescape::unescape;
pub use vars::Vars;
