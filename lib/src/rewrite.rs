//! Expands `prefix:local` names in SPARQL text into full `<IRI>` references using a
//! [`NamespaceRegistry`]. The scanner understands just enough of the SPARQL lexical grammar
//! to leave IRIs, strings, comments, variables, language tags and blank node labels alone.

use crate::errors::{BrickGraphError, Result};
use crate::namespaces::{is_local_char, NamespaceRegistry};
use crate::options::PrefixPolicy;
use log::debug;
use std::collections::HashSet;

/// Rewrites every registered `prefix:local` token in `text` to `<namespace local>`.
///
/// Prefixes declared in the query's own `PREFIX` prologue shadow the registry and are left
/// for the SPARQL parser. Tokens with unknown prefixes are copied unchanged under
/// [`PrefixPolicy::PassThrough`] and rejected under [`PrefixPolicy::Strict`].
pub fn expand_query(
    text: &str,
    registry: &NamespaceRegistry,
    policy: PrefixPolicy,
) -> Result<String> {
    let mut out = String::with_capacity(text.len() + 64);
    let mut declared: HashSet<&str> = HashSet::new();
    let mut in_prefix_decl = false;
    let mut expanded = 0usize;
    let mut pos = 0;

    while let Some(c) = text[pos..].chars().next() {
        let start = pos;
        match c {
            '#' => {
                pos = text[pos..]
                    .find('\n')
                    .map(|offset| pos + offset)
                    .unwrap_or(text.len());
            }
            '"' | '\'' => pos = scan_string(text, pos, c),
            '<' => pos = scan_iri(text, pos).unwrap_or(pos + 1),
            '?' | '$' => pos = scan_while(text, pos + 1, is_var_char),
            '@' => pos = scan_while(text, pos + 1, |c| c.is_ascii_alphanumeric() || c == '-'),
            '_' if text[pos + 1..].starts_with(':') => {
                pos = scan_local(text, pos + 2);
            }
            ':' => {
                // empty prefix, only valid if the query declares it
                let end = scan_local(text, pos + 1);
                if in_prefix_decl {
                    declared.insert("");
                    in_prefix_decl = false;
                } else if policy.is_strict() && !declared.contains("") {
                    return Err(BrickGraphError::UnresolvedPrefix(String::new()));
                }
                pos = end;
            }
            c if c.is_alphabetic() => {
                let mut word_end = scan_while(text, pos, |c| {
                    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
                });
                while word_end > pos && text[..word_end].ends_with('.') {
                    word_end -= 1;
                }
                if !text[word_end..].starts_with(':') {
                    let word = &text[pos..word_end];
                    if word.eq_ignore_ascii_case("PREFIX") {
                        in_prefix_decl = true;
                    }
                    out.push_str(word);
                    pos = word_end;
                    continue;
                }
                let prefix = &text[pos..word_end];
                let local_start = word_end + 1;
                let local_end = scan_local(text, local_start);
                pos = local_end;
                if in_prefix_decl {
                    declared.insert(prefix);
                    in_prefix_decl = false;
                } else if !declared.contains(prefix) {
                    if let Some(namespace) = registry.namespace(prefix) {
                        out.push('<');
                        out.push_str(namespace);
                        push_unescaped(&mut out, &text[local_start..local_end]);
                        out.push('>');
                        expanded += 1;
                        continue;
                    }
                    if policy.is_strict() {
                        return Err(BrickGraphError::UnresolvedPrefix(prefix.to_string()));
                    }
                    debug!("Leaving unregistered prefix '{}' in query", prefix);
                }
            }
            c if c.is_ascii_digit() => {
                pos = scan_while(text, pos, |c| c.is_ascii_alphanumeric() || c == '.');
            }
            c => pos += c.len_utf8(),
        }
        out.push_str(&text[start..pos]);
    }

    debug!("Expanded {} prefixed names", expanded);
    Ok(out)
}

fn is_var_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn scan_while(text: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
    text[pos..]
        .char_indices()
        .find(|(_, c)| !pred(*c))
        .map(|(offset, _)| pos + offset)
        .unwrap_or(text.len())
}

/// End of a local name starting at `pos`, honoring `\` escapes and `%XX` sequences. A
/// trailing `.` terminates the triple and is not part of the name.
fn scan_local(text: &str, pos: usize) -> usize {
    let mut end = pos;
    let mut last_escaped = false;
    let mut chars = text[pos..].char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((escaped_offset, escaped)) => {
                    end = pos + escaped_offset + escaped.len_utf8();
                    last_escaped = true;
                    continue;
                }
                None => break,
            }
        }
        if c == '%' || is_local_char(c) {
            end = pos + offset + c.len_utf8();
            last_escaped = false;
        } else {
            break;
        }
    }
    while !last_escaped && end > pos && text[..end].ends_with('.') {
        end -= 1;
    }
    end
}

fn push_unescaped(out: &mut String, local: &str) {
    let mut chars = local.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
}

/// End of the string literal opening at `pos`. Unterminated strings run to the end of the
/// text so the parser reports them.
fn scan_string(text: &str, pos: usize, quote: char) -> usize {
    let long_quote: String = std::iter::repeat(quote).take(3).collect();
    let (body_start, long) = if text[pos..].starts_with(&long_quote) {
        (pos + 3, true)
    } else {
        (pos + 1, false)
    };
    let mut chars = text[body_start..].char_indices();
    while let Some((offset, c)) = chars.next() {
        let at = body_start + offset;
        if c == '\\' {
            chars.next();
        } else if long && text[at..].starts_with(&long_quote) {
            return at + 3;
        } else if !long && c == quote {
            return at + 1;
        }
    }
    text.len()
}

/// End of the IRIREF opening at `pos`, or None if `<` is the less-than operator.
fn scan_iri(text: &str, pos: usize) -> Option<usize> {
    for (offset, c) in text[pos + 1..].char_indices() {
        match c {
            '>' => return Some(pos + 1 + offset + 1),
            '<' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => return None,
            c if c <= ' ' => return None,
            _ => {}
        }
    }
    None
}
