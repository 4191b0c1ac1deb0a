//! Line splitting that keeps original terminators

/// Split `text` into `(content, terminator)` pairs.
///
/// Terminators are `\n`, `\r\n` or a lone `\r`; the final line may have
/// none. Concatenating every pair reproduces `text` exactly.
pub fn split_lines(text: &str) -> Vec<(&str, &str)> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push((&text[start..i], &text[i..i + 1]));
                i += 1;
                start = i;
            }
            b'\r' => {
                let width = if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                lines.push((&text[start..i], &text[i..i + width]));
                i += width;
                start = i;
            }
            _ => i += 1,
        }
    }

    if start < text.len() {
        lines.push((&text[start..], ""));
    }
    lines
}

/// Whether a line is empty or whitespace only
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
