//! Common constants used throughout skel.

/// Directory name of the application data home under the platform data dir
pub const APP_DIR: &str = "skel";

/// Template store directory name inside the data home
pub const TEMPLATES_DIR: &str = "templates";

/// History store file name inside the data home
pub const HISTORY_FILE: &str = "history.json";

/// Extension of stored template documents
pub const TEMPLATE_EXTENSION: &str = "json";

/// Infix between the original directory name and the backup timestamp
pub const BACKUP_INFIX: &str = "_backup_";

/// Timestamp format used in backup directory names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Calendar month bucket format used by the history summary
pub const MONTH_FORMAT: &str = "%Y-%m";

/// Editor used when neither the CLI nor the environment names one
pub const DEFAULT_EDITOR: &str = "code";

/// Environment variables
pub const ENV_HOME: &str = "SKEL_HOME";
pub const ENV_EDITOR: &str = "SKEL_EDITOR";
pub const ENV_EDITOR_LEGACY: &str = "VS_CODE_PATH";
pub const ENV_LOG_FILE: &str = "SKEL_LOG_FILE";
