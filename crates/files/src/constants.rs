/// Suffix appended to the registry file name to form the sidecar lock path.
pub const LOCK_SUFFIX: &str = ".lock";

/// Suffix appended to the registry file name to form the temporary write path.
pub const TEMP_SUFFIX: &str = ".tmp";
