//! `toploader-io` — delimited-text file I/O.
//!
//! Reads the messy exports (CSV/TSV/semicolon/pipe, mixed encodings, quoted
//! fields with embedded delimiters and newlines) into a uniform
//! [`RawTable`], and writes tables back out through a proper CSV writer.

pub mod delim;

pub use delim::{parse, read_table, sniff_delimiter, write_table, RawTable};
