//! Escaping and field splitting for delimited lines.
//!
//! Free text is escaped so that it never contains a bare delimiter:
//!
//! | Raw       | Escaped |
//! |-----------|---------|
//! | `\`       | `\\`    |
//! | `,`       | `\,`    |
//! | `;`       | `\;`    |
//! | `[` / `]` | `\[` / `\]` |
//! | newline   | `\n`    |
//! | CR        | `\r`    |
//!
//! Text without special characters is written unchanged.

/// Escapes a free-text value for embedding in a line
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' | ',' | ';' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`]
///
/// A trailing lone backslash is kept as-is.
pub fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits `line` on unescaped `sep` characters outside brackets
///
/// At most `limit` pieces are returned; the last piece holds the unsplit
/// remainder. Pieces are returned still escaped.
pub fn split_fields_n(line: &str, sep: char, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    if limit == 0 {
        return pieces;
    }

    let mut start = 0;
    let mut depth: usize = 0;
    let mut escaped = false;

    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                if pieces.len() + 1 == limit {
                    break;
                }
                pieces.push(&line[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    pieces.push(&line[start..]);
    pieces
}

/// Splits `line` on every unescaped `sep` outside brackets
pub fn split_fields(line: &str, sep: char) -> Vec<&str> {
    split_fields_n(line, sep, usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(escape("In Progress"), "In Progress");
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = "a,b;c [d] \\ e\nf\rg";
        let escaped = escape(raw);
        assert!(!escaped.contains('\n'));
        assert_eq!(split_fields(&escaped, ',').len(), 1);
        assert_eq!(unescape(&escaped), raw);
    }

    #[test]
    fn test_unescape_trailing_backslash() {
        assert_eq!(unescape("abc\\"), "abc\\");
    }

    #[test]
    fn test_split_respects_escapes_and_brackets() {
        let line = "id,na\\,me,[s1,A;s2,B]";
        assert_eq!(split_fields(line, ','), vec!["id", "na\\,me", "[s1,A;s2,B]"]);
    }

    #[test]
    fn test_split_keeps_empty_fields() {
        assert_eq!(split_fields("a,,b,", ','), vec!["a", "", "b", ""]);
        assert_eq!(split_fields("", ','), vec![""]);
    }

    #[test]
    fn test_split_with_limit_keeps_remainder() {
        assert_eq!(split_fields_n("a,b,c,d", ',', 3), vec!["a", "b", "c,d"]);
        assert_eq!(split_fields_n("a,b", ',', 3), vec!["a", "b"]);
    }

    #[test]
    fn test_split_unbalanced_bracket_swallows_rest() {
        assert_eq!(split_fields("a,[b,c", ','), vec!["a", "[b,c"]);
    }
}
