//! Solr query syntax escaping
//!
//! Reserved: `+ - && || ! ( ) { } [ ] ^ " ~ * ? :` and space.
//! <https://lucene.apache.org/core/2_9_4/queryparsersyntax.html>
//!
//! Escaping is applied to the raw value only, before any wildcard or range
//! wrapping, so the wrapping tokens themselves stay live.

const RESERVED: &[char] = &[
    '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', ' ',
];

fn is_reserved(c: char) -> bool {
    RESERVED.contains(&c)
}

/// Characters a backslash may already be escaping
fn is_escape_target(c: char) -> bool {
    is_reserved(c) || matches!(c, '\\' | '&' | '|')
}

/// Backslash-escape every reserved character of `value`.
///
/// A reserved character already preceded by a backslash is left as it is,
/// so escaping an escaped value changes nothing. Any other backslash is
/// itself escaped and never swallows the character after it.
pub fn escape_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next) if is_escape_target(next) => {
                    chars.next();
                    out.push('\\');
                    out.push(next);
                }
                _ => out.push_str(r"\\"),
            },
            '&' | '|' if chars.peek() == Some(&c) => {
                chars.next();
                out.push('\\');
                out.push(c);
                out.push(c);
            }
            c if is_reserved(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }

    out
}

/// Escape unless the caller declared the value pre-escaped
pub fn escape_unless(value: &str, escaped: bool) -> String {
    if escaped {
        value.to_string()
    } else {
        escape_query(value)
    }
}
