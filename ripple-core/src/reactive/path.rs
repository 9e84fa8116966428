//! Dotted path expressions for string-sourced watchers.

use smallvec::SmallVec;

use crate::observer::{Object, Value};

/// Parsed path segments.
pub type Path = SmallVec<[String; 4]>;

/// Split `"a.b.c"` into its segments.
///
/// Only word characters, `.` and `$` are allowed; anything else makes the
/// expression invalid.
pub fn parse_path(expression: &str) -> Option<Path> {
    let valid = expression
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$');
    if !valid {
        return None;
    }
    Some(expression.split('.').map(str::to_string).collect())
}

/// Read a parsed path starting from `context`.
///
/// Resolution stops with `Undefined` as soon as a segment reads a
/// non-container.
pub fn resolve_path(context: &Object, segments: &[String]) -> Value {
    let mut current = Value::Object(context.clone());
    for segment in segments {
        if !current.is_container() {
            return Value::Undefined;
        }
        current = current.get(segment);
    }
    current
}
