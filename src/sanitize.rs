//! Object key sanitization.
//!
//! Names are cleaned by literal substring removal, not path normalization:
//! every `/` is removed, then every `\`, then every `..`. Because separators
//! go first, `a/../b` becomes `ab` rather than resolving to `b`.

const FORBIDDEN: [&str; 3] = ["/", "\\", ".."];

/// Strips path separators and parent-directory sequences from `name`.
pub fn sanitize_file_name(name: &str) -> String {
    FORBIDDEN
        .iter()
        .fold(name.to_string(), |acc, pattern| acc.replace(pattern, ""))
}

/// True when `name` would pass through [`sanitize_file_name`] unchanged.
pub fn is_clean(name: &str) -> bool {
    !FORBIDDEN.iter().any(|pattern| name.contains(pattern))
}
