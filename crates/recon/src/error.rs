use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (negative threshold, no inputs, etc.).
    ConfigValidation(String),
    /// None of the candidate input paths exist.
    MissingInput(String),
    /// An input file parsed to no headers or no data rows.
    EmptyInput(String),
    /// IO error (file read/write, surfaced by the caller).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingInput(paths) => write!(f, "no input file found, tried: {paths}"),
            Self::EmptyInput(path) => write!(f, "input has no usable rows: {path}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
