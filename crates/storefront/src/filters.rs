//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns a dash when the value renders as blank.
///
/// Usage in templates: `{{ profile.company|or_dash }}`
#[askama::filter_fn]
pub fn or_dash(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(dash_if_blank(value.to_string()))
}

fn dash_if_blank(value: String) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_render_as_dash() {
        assert_eq!(dash_if_blank(String::new()), "-");
        assert_eq!(dash_if_blank("  ".to_string()), "-");
        assert_eq!(dash_if_blank("Agro UAB".to_string()), "Agro UAB");
    }
}
