// src/utils/html.rs

/// Strips unsafe markup from trainer-authored text (scenario and task
/// descriptions, grading feedback) while keeping harmless formatting tags.
///
/// `<script>` elements are removed together with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// `clean_html` for optional fields.
pub fn clean_optional(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_scripts_keeps_formatting() {
        let cleaned = clean_html("<b>Deadline</b><script>alert(1)</script>");
        assert_eq!(cleaned, "<b>Deadline</b>");
    }

    #[test]
    fn strips_event_handlers() {
        let cleaned = clean_html(r#"<p onclick="steal()">Review</p>"#);
        assert_eq!(cleaned, "<p>Review</p>");
    }

    #[test]
    fn optional_passthrough() {
        assert_eq!(clean_optional(None), None);
    }
}
