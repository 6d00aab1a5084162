//! Whitespace tokenizer that keeps quoted spans intact.
//!
//! Spaces, tabs and line breaks separate tokens except inside a `"…"` or
//! `` `…` `` span, where they are kept literally and the delimiters stay part
//! of the token. The two span kinds do not nest and are mutually exclusive:
//! inside one, the other's delimiter is an ordinary character.

pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut in_backtick = false;

    for ch in input.chars() {
        match ch {
            '`' if !in_quote => {
                if in_backtick {
                    current.push(ch);
                    tokens.push(std::mem::take(&mut current));
                    in_backtick = false;
                } else {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    current.push(ch);
                    in_backtick = true;
                }
            }
            '"' if !in_backtick => {
                if in_quote {
                    current.push(ch);
                    tokens.push(std::mem::take(&mut current));
                    in_quote = false;
                } else {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    current.push(ch);
                    in_quote = true;
                }
            }
            ' ' | '\t' | '\n' | '\r' if !in_quote && !in_backtick => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
