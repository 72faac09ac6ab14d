const DEFAULT_FILENAME: &str = "output";

/// Longest file stem kept before truncation.
const MAX_FILENAME_CHARS: usize = 200;

/// Sanitize a string for use as a filename
pub fn sanitize_filename(input: &str) -> String {
    // Replace characters that are invalid in filenames
    let invalid_chars = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    let mut result = String::with_capacity(input.len());

    for c in input.chars() {
        if invalid_chars.contains(&c) || c < ' ' {
            result.push('_');
        } else {
            result.push(c);
        }
    }

    // Remove leading and trailing dots and spaces
    let remove_array = ['.', ' '];
    let result = result
        .trim_start_matches(|c| remove_array.contains(&c))
        .trim_end_matches(|c| remove_array.contains(&c))
        .to_string();

    if result.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else if result.chars().count() > MAX_FILENAME_CHARS {
        result.chars().take(MAX_FILENAME_CHARS).collect()
    } else {
        result
    }
}
