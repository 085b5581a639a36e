//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//! Classification outcomes (unmatched, ambiguous, duplicate groups) are
//! reported results, never failures: a run that produced them still exits 0.

/// Success - the run completed, whatever it classified.
pub const EXIT_SUCCESS: u8 = 0;

/// Fatal error - missing/unreadable input, bad config, failed write.
/// Emitted before any output file is touched.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;
