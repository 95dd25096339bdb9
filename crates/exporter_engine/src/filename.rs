use exporter_core::{ExportFormat, ERROR_PREFIX};

pub const MAX_TITLE_CHARS: usize = 50;

/// `{sanitized_title}_{id}.{ext}`. The id suffix keeps names unique when
/// titles collide.
pub fn export_filename(title: &str, id: &str, format: ExportFormat) -> String {
    let title = sanitize_title(title);
    let id = sanitize_component(id, true);
    if id.is_empty() {
        format!("{title}.{}", format.extension())
    } else {
        format!("{title}_{id}.{}", format.extension())
    }
}

/// Name of the placeholder written when an item could not be exported.
pub fn error_filename(id: &str) -> String {
    format!("{ERROR_PREFIX}{}.txt", sanitize_component(id, true))
}

/// Letters and digits of any script are kept; every other run of characters
/// becomes a single underscore. Truncated to [`MAX_TITLE_CHARS`] characters.
pub fn sanitize_title(input: &str) -> String {
    let compacted = sanitize_component(input, false);
    let mut truncated: String = compacted.chars().take(MAX_TITLE_CHARS).collect();
    while truncated.ends_with('_') {
        truncated.pop();
    }
    if truncated.is_empty() {
        "Untitled".to_string()
    } else {
        truncated
    }
}

fn sanitize_component(input: &str, keep_dash: bool) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if c.is_alphanumeric() || (keep_dash && c == '-') {
            compacted.push(c);
            prev_underscore = false;
        } else {
            if !prev_underscore {
                compacted.push('_');
            }
            prev_underscore = true;
        }
    }
    compacted.trim_matches('_').to_string()
}
