use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Oncodesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default address the HTTP API binds to.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8700";

/// Ownership defaults stamped onto created records until an authenticated
/// session supplies real values. Single-tenant deployment assumption.
pub const DEFAULT_CLINIC_ID: &str = "clinic-default";
pub const DEFAULT_USER_ID: &str = "user-default";

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Oncodesk/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Path of the patient database file.
pub fn database_path() -> PathBuf {
    app_data_dir().join("patients.db")
}
