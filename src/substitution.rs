use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::env::EnvLookup;
use crate::vars::Vars;

/// A `$NAME` reference: a dollar sign followed by ASCII letters, digits or
/// underscores.
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$[0-9a-zA-Z_]+").expect("variable pattern should be valid")
});

/// Result of expanding one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expansion<'a> {
    pub value: Cow<'a, str>,
    /// Set when expansion stopped at the replacement limit; holds the name of
    /// the reference that was left in place.
    pub truncated_at: Option<String>,
}

/// Replace `$NAME` references, leftmost first, until none remain.
///
/// Each name resolves to the value already parsed into `vars`, then to the
/// host environment, then to an empty string. The whole value is scanned
/// again after every replacement, so a resolved value may itself introduce
/// further references. At most `limit` replacements are performed.
pub(crate) fn expand_variables<'a, E>(
    input: &'a str,
    vars: &Vars,
    env: &E,
    limit: usize,
) -> Expansion<'a>
where
    E: EnvLookup + ?Sized,
{
    if !input.contains('$') {
        return Expansion {
            value: Cow::Borrowed(input),
            truncated_at: None,
        };
    }

    let mut result = Cow::Borrowed(input);
    let mut replacements = 0usize;

    while let Some(found) = VARIABLE_PATTERN.find(&result) {
        let range = found.range();
        let name = &result[range.start + 1..range.end];

        if replacements == limit {
            warn!(variable = name, limit, "variable substitution limit reached");
            let name = name.to_owned();
            return Expansion {
                value: result,
                truncated_at: Some(name),
            };
        }

        let replacement = match vars.get(name) {
            Some(value) => value.to_owned(),
            None => env.get_var(name).unwrap_or_default(),
        };

        let mut next = String::with_capacity(result.len() + replacement.len());
        next.push_str(&result[..range.start]);
        next.push_str(&replacement);
        next.push_str(&result[range.end..]);
        result = Cow::Owned(next);
        replacements += 1;
    }

    Expansion {
        value: result,
        truncated_at: None,
    }
}
