use http::StatusCode;

/// Render a status code as a status line, e.g. `404 Not Found`.
///
/// Codes without a canonical reason phrase are rendered as `<code> Unknown`.
pub fn status_line(code: StatusCode) -> String {
    format!(
        "{} {}",
        code.as_str(),
        code.canonical_reason().unwrap_or("Unknown")
    )
}
