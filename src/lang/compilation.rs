use crate::{lang::tokenizing::Token, runtime::data_structures::value::Number};
use num_bigint::BigInt;
use std::str::FromStr;

/// The two flavors of code block.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BlockKind {
    /// `[ ... ]`, the block works directly on its caller's stack.
    Sharing,

    /// `{ ... }`, the block gets a fresh stack for every run and hands its top value back.
    Isolated,
}

/// What a single token means to the compiler, before anything is interned.
#[derive(Clone, PartialEq, Debug)]
pub enum Classified {
    Int(i64),
    Number(Number),
    Str(String),
    Bool(bool),
    Word(String),
    BlockOpen(BlockKind),
    BlockClose(BlockKind),
}

/// Prefix that forces a numeric literal through the arbitrary precision path.
const BIG_NUMBER_PREFIX: char = 'L';

/// Classify a token.  The order matters and is first match wins: structural delimiters, machine
/// integers, big numbers and doubles, strings, booleans, and finally words.
pub fn classify(token: &Token) -> Classified {
    let text = match token {
        Token::String(_, _, text) => return Classified::Str(text.clone()),
        Token::Word(_, text) => text.as_str(),
    };

    match text {
        "[" => return Classified::BlockOpen(BlockKind::Sharing),
        "]" => return Classified::BlockClose(BlockKind::Sharing),
        "{" => return Classified::BlockOpen(BlockKind::Isolated),
        "}" => return Classified::BlockClose(BlockKind::Isolated),
        _ => {}
    }

    if let Some(value) = parse_machine_int(text) {
        Classified::Int(value)
    } else if let Some(number) = parse_big_number(text) {
        Classified::Number(number)
    } else if text == "true" {
        Classified::Bool(true)
    } else if text == "false" {
        Classified::Bool(false)
    } else {
        Classified::Word(text.to_string())
    }
}

/// Parse a hex, octal or decimal integer that fits in an i64.  A leading 0x means hex, any other
/// leading 0 means octal.
pub fn parse_machine_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let (radix, digits) = if let Some(hex) = digits.strip_prefix("0x") {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    // from_str_radix accepts a sign of its own, we've already dealt with that.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    // Parse with the sign attached so that i64::MIN still fits.
    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };

    i64::from_str_radix(&signed, radix).ok()
}

/// Parse a literal that needs the number table.  Anything with a . is a double, everything else an
/// arbitrary precision decimal integer.
pub fn parse_big_number(text: &str) -> Option<Number> {
    let text = text.strip_prefix(BIG_NUMBER_PREFIX).unwrap_or(text);

    if text.is_empty() || !text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        return None;
    }

    if text.contains('.') {
        text.parse::<f64>().ok().map(Number::Double)
    } else {
        BigInt::from_str(text).ok().map(Number::Big)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::tokenizing::tokenize_from_source;

    fn classify_text(source: &str) -> Classified {
        let tokens = tokenize_from_source("<test>", source).unwrap();
        classify(&tokens[0])
    }

    #[test]
    fn machine_integers_in_every_radix() {
        assert_eq!(classify_text("42"), Classified::Int(42));
        assert_eq!(classify_text("-42"), Classified::Int(-42));
        assert_eq!(classify_text("0x1f"), Classified::Int(31));
        assert_eq!(classify_text("017"), Classified::Int(15));
        assert_eq!(classify_text("0"), Classified::Int(0));
        assert_eq!(classify_text("-9223372036854775808"), Classified::Int(i64::MIN));
    }

    #[test]
    fn overflowing_integers_become_big() {
        assert_eq!(
            classify_text("9223372036854775808"),
            Classified::Number(Number::Big(BigInt::from(i64::MAX) + 1))
        );
    }

    #[test]
    fn prefix_forces_the_big_path() {
        assert_eq!(classify_text("L5"), Classified::Number(Number::Big(BigInt::from(5))));
    }

    #[test]
    fn dotted_literals_are_doubles() {
        assert_eq!(classify_text("2.5"), Classified::Number(Number::Double(2.5)));
    }

    #[test]
    fn words_strings_and_booleans() {
        assert_eq!(classify_text("\"12\""), Classified::Str("12".to_string()));
        assert_eq!(classify_text("true"), Classified::Bool(true));
        assert_eq!(classify_text("."), Classified::Word(".".to_string()));
        assert_eq!(classify_text(".s"), Classified::Word(".s".to_string()));
        assert_eq!(classify_text("2dup"), Classified::Word("2dup".to_string()));
        assert_eq!(classify_text("-"), Classified::Word("-".to_string()));
        assert_eq!(classify_text("L"), Classified::Word("L".to_string()));
        assert_eq!(classify_text("{"), Classified::BlockOpen(BlockKind::Isolated));
        assert_eq!(classify_text("]"), Classified::BlockClose(BlockKind::Sharing));
    }
}
