use std::borrow::Cow;

/// Decode backslash escape sequences.
///
/// Recognized forms, tried in this order at each backslash:
///
/// - `\a \b \f \n \r \t \v \? \" \' \\`
/// - octal `\d`, `\dd` or `\ddd` where a three digit escape starts with `0`-`3`
/// - `\uXXXX`, combining a `\uD8xx\uDCxx` surrogate pair into one character
/// - `\UXXXXXXXX`
///
/// A backslash that starts none of these is kept as a literal character.
/// Code points that are not valid characters decode to U+FFFD.
pub fn unescape(input: &str) -> Cow<'_, str> {
    if !input.contains('\\') {
        return Cow::Borrowed(input);
    }

    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut idx = 0usize;

    while idx < chars.len() {
        let ch = chars[idx];
        if ch != '\\' {
            out.push(ch);
            idx += 1;
            continue;
        }

        let rest = &chars[idx + 1..];
        let (decoded, consumed) = decode_escape(rest).unwrap_or(('\\', 0));
        out.push(decoded);
        idx += 1 + consumed;
    }

    Cow::Owned(out)
}

/// Decode the escape following a backslash, returning the character and the
/// number of characters consumed after the backslash.
fn decode_escape(rest: &[char]) -> Option<(char, usize)> {
    let first = *rest.first()?;

    if let Some(simple) = simple_escape(first) {
        return Some((simple, 1));
    }

    let digits = octal_len(rest);
    if digits > 0 {
        let code = rest[..digits]
            .iter()
            .fold(0u32, |acc, digit| acc * 8 + digit.to_digit(8).unwrap_or(0));
        return Some((char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER), digits));
    }

    match first {
        'u' => {
            let code = hex_code(&rest[1..], 4)?;
            if (0xD800..=0xDBFF).contains(&code)
                && let Some(low) = low_surrogate_after(&rest[5..])
            {
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                return Some((to_char(combined), 11));
            }
            Some((to_char(code), 5))
        }
        'U' => {
            let code = hex_code(&rest[1..], 8)?;
            Some((to_char(code), 9))
        }
        _ => None,
    }
}

fn simple_escape(ch: char) -> Option<char> {
    let decoded = match ch {
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0C}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{0B}',
        '?' | '"' | '\'' | '\\' => ch,
        _ => return None,
    };
    Some(decoded)
}

/// Length of the octal escape matching `[0-3]?[0-7]{1,2}` at the start of
/// `rest`, preferring the longest form.
fn octal_len(rest: &[char]) -> usize {
    let count_octal = |chars: &[char]| {
        chars
            .iter()
            .take(2)
            .take_while(|ch| matches!(ch, '0'..='7'))
            .count()
    };

    if matches!(rest.first(), Some('0'..='3')) {
        let tail = count_octal(&rest[1..]);
        if tail > 0 {
            return 1 + tail;
        }
    }

    count_octal(rest)
}

fn hex_code(chars: &[char], len: usize) -> Option<u32> {
    let digits = chars.get(..len)?;
    digits.iter().try_fold(0u32, |acc, digit| {
        digit.to_digit(16).map(|value| (acc << 4) | value)
    })
}

fn low_surrogate_after(rest: &[char]) -> Option<u32> {
    if rest.len() < 6 || rest[0] != '\\' || rest[1] != 'u' {
        return None;
    }
    let code = hex_code(&rest[2..], 4)?;
    (0xDC00..=0xDFFF).contains(&code).then_some(code)
}

fn to_char(code: u32) -> char {
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}
