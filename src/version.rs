/// Returns the main version identifier, e.g. `v0.1`.
pub(crate) fn identifier() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let digits = version.strip_suffix(".0").unwrap_or(version);
    format!("v{digits}")
}

/// Returns a string containing all version-related information.
pub(crate) fn full() -> String {
    format!("{} ({})", identifier(), env!("CARGO_PKG_NAME"))
}
