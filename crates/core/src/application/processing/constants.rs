// Processing loop constants (no magic values)

/// Exit code reported for an action that panicked or could not be started
pub const SYNTHETIC_FAILURE_EXIT_CODE: i32 = -1;
