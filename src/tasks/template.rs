//! Literal single-brace placeholder handling for task templates.
//!
//! No control flow, no conditionals: a template is plain text with
//! `{placeholder}` tokens, each resolved exactly once.

/// Collects the placeholder names referenced by a template, in order of
/// appearance. Returns an error string for malformed templates (unclosed or
/// empty placeholders) so config validation can reject them up front.
pub fn scan_placeholders(template: &str) -> Result<Vec<String>, String> {
    let mut found = Vec::new();
    let mut cursor = template;

    while let Some(start) = cursor.find('{') {
        let after_open = &cursor[start + 1..];
        let Some(close_offset) = after_open.find('}') else {
            return Err("unclosed placeholder in template".to_string());
        };
        let token = after_open[..close_offset].trim();
        if token.is_empty() {
            return Err("empty placeholder in template".to_string());
        }
        if token.contains('{') {
            return Err(format!("nested placeholder `{{{token}}}` in template"));
        }
        found.push(token.to_string());
        cursor = &after_open[close_offset + 1..];
    }

    Ok(found)
}

/// Substitutes every `{placeholder}` through `resolve`. The resolver decides
/// what a missing key means; this function only walks the template.
pub fn substitute<E, F>(template: &str, mut resolve: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = template;

    while let Some(start) = cursor.find('{') {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 1..];
        // Malformed templates are rejected at config load; an unclosed brace
        // here is unreachable through a validated template set.
        let close_offset = match after_open.find('}') {
            Some(offset) => offset,
            None => {
                rendered.push('{');
                rendered.push_str(after_open);
                return Ok(rendered);
            }
        };
        let token = after_open[..close_offset].trim();
        rendered.push_str(&resolve(token)?);
        cursor = &after_open[close_offset + 1..];
    }

    rendered.push_str(cursor);
    Ok(rendered)
}
