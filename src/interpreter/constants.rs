// Constants for the interpreter

/// Default number of drive events kept for replay
pub const DEFAULT_TRACE_LIMIT: usize = 100_000;

/// Nested calls and generator drives allowed before `RecursionError`
pub const MAX_CALL_DEPTH: usize = 64;

/// Longest list or string a repetition may build
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;
