//! Quoted string literal handling.
//!
//! Literal text may contain parentheses, commas and clause keywords. Before
//! any scan, parentheses inside literals are swapped for private-use
//! sentinels, and scans run over a masked copy where every literal and
//! comment is blanked out. Both transformations preserve byte offsets of the code
//! outside literals.

/// Stands in for `(` inside a quoted literal.
pub(crate) const OPEN_SENTINEL: char = '\u{E000}';

/// Stands in for `)` inside a quoted literal.
pub(crate) const CLOSE_SENTINEL: char = '\u{E001}';

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Code,
    Literal { quote: char, escaped: bool },
    LineComment,
    /// `opened` is false while on the `*` of `/*`, which must not close it.
    BlockComment { star: bool, opened: bool },
}

/// Walks `text` and calls `visit(ch, hidden)` for every character.
///
/// Quoted literals (quotes included) and `//` or `/* */` comments are
/// hidden. Backslash escapes are honoured, so `'it\'s'` is one literal.
fn scan_literals<F: FnMut(char, bool)>(text: &str, mut visit: F) {
    let mut state = ScanState::Code;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        let (hidden, next) = match state {
            ScanState::Code => match (ch, chars.peek()) {
                ('\'' | '"', _) => (
                    true,
                    ScanState::Literal {
                        quote: ch,
                        escaped: false,
                    },
                ),
                ('/', Some('/')) => (true, ScanState::LineComment),
                ('/', Some('*')) => (
                    true,
                    ScanState::BlockComment {
                        star: false,
                        opened: false,
                    },
                ),
                _ => (false, ScanState::Code),
            },
            ScanState::Literal { quote, escaped } => {
                let next = if escaped {
                    ScanState::Literal {
                        quote,
                        escaped: false,
                    }
                } else if ch == '\\' {
                    ScanState::Literal {
                        quote,
                        escaped: true,
                    }
                } else if ch == quote {
                    ScanState::Code
                } else {
                    state
                };
                (true, next)
            }
            ScanState::LineComment if ch == '\n' => (false, ScanState::Code),
            ScanState::LineComment => (true, ScanState::LineComment),
            ScanState::BlockComment { star, opened } => {
                if opened && star && ch == '/' {
                    (true, ScanState::Code)
                } else {
                    (
                        true,
                        ScanState::BlockComment {
                            star: opened && ch == '*',
                            opened: true,
                        },
                    )
                }
            }
        };
        visit(ch, hidden);
        state = next;
    }
}

/// Replace parentheses inside quoted literals and comments with sentinels.
pub(crate) fn escape_parens_in_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    scan_literals(text, |ch, inside| {
        out.push(match (ch, inside) {
            ('(', true) => OPEN_SENTINEL,
            (')', true) => CLOSE_SENTINEL,
            (other, _) => other,
        });
    });
    out
}

/// Restore parentheses hidden by [`escape_parens_in_literals`].
pub(crate) fn unescape_parens(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            OPEN_SENTINEL => '(',
            CLOSE_SENTINEL => ')',
            other => other,
        })
        .collect()
}

/// Copy of `text` with every literal and comment character replaced by
/// spaces.
///
/// Each masked character becomes as many spaces as it has UTF-8 bytes, so
/// offsets into the mask are valid offsets into `text`.
pub(crate) fn mask_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    scan_literals(text, |ch, inside| {
        if inside {
            out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
        } else {
            out.push(ch);
        }
    });
    out
}

/// Strip the quotes of a single- or double-quoted literal and resolve its
/// backslash escapes. Returns `None` when `text` is not one quoted literal.
pub(crate) fn unquote(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let open = chars.next()?;
    if open != '\'' && open != '"' {
        return None;
    }
    if text.len() < 2 || !text.ends_with(open) {
        return None;
    }

    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut pending_escape = false;
    for ch in inner.chars() {
        if pending_escape {
            match ch {
                '\'' | '"' | '\\' => out.push(ch),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
            pending_escape = false;
        } else if ch == '\\' {
            pending_escape = true;
        } else if ch == open {
            // An unescaped closing quote before the end means two literals.
            return None;
        } else {
            out.push(ch);
        }
    }
    if pending_escape {
        out.push('\\');
    }
    Some(out)
}
