//! Chat text helpers: template tokens and colour codes.

use std::collections::BTreeMap;

/// Section sign that starts a formatting code in game chat.
pub const COLOR_CHAR: char = '§';

/// Substitutes `%key%` tokens in a template in a single pass.
///
/// Tokens with no entry in `substitutions` are left as written, and
/// substituted values are never re-scanned for tokens.
pub fn substitute(template: &str, substitutions: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let value = after
            .find('%')
            .and_then(|end| substitutions.get(&after[..end]).map(|v| (v, end)));
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rewrites `alt` + code pairs (e.g. `&c`) into section-sign codes.
///
/// Only valid colour/format codes are rewritten; a lone `&` stays.
pub fn translate_color_codes(alt: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == alt {
            if let Some(&next) = chars.peek() {
                if is_format_code(next) {
                    out.push(COLOR_CHAR);
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}
