//! Results file ingestion: digest verification and parsing of `.racecheck` exports.

mod digest;
mod parser;

pub use digest::{hashes_match, sha256_hex};
pub use parser::{ParseError, ParsedResults, ParsedRow, parse_results};
