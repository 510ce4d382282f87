use std::borrow::Cow;
use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::env::{EnvLookup, HostEnv};
use crate::error::{Diagnostic, DiagnosticKind, Error};
use crate::model::{Entry, ParseOptions};
use crate::substitution::expand_variables;
use crate::unescape::unescape;
use crate::vars::Vars;

static EXPORT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*export\s+").expect("export pattern should be valid")
});

/// Parse lines with the given options, resolving `$NAME` fallbacks against the
/// process environment.
pub fn parse_lines<I, S>(lines: I, options: ParseOptions) -> Vars
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Parser::new(options).parse_lines(lines)
}

/// Parse text, splitting it into lines on `\n` or `\r\n`.
pub fn parse_str(input: &str, options: ParseOptions) -> Vars {
    Parser::new(options).parse_str(input)
}

/// Parse UTF-8 bytes.
pub fn parse_bytes(input: &[u8], options: ParseOptions) -> Result<Vars, Error> {
    Parser::new(options).parse_bytes(input)
}

/// Parse everything a buffered reader yields.
pub fn parse_reader<R: BufRead>(reader: R, options: ParseOptions) -> Result<Vars, Error> {
    Parser::new(options).parse_reader(reader)
}

/// Outcome of a parse together with notes about skipped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub vars: Vars,
    pub diagnostics: Vec<Diagnostic>,
}

/// Line parser bound to a set of options and a host environment.
#[derive(Debug, Clone)]
pub struct Parser<E = HostEnv> {
    options: ParseOptions,
    env: E,
}

impl Parser<HostEnv> {
    pub fn new(options: ParseOptions) -> Self {
        Self::with_env(options, HostEnv::process())
    }
}

impl Default for Parser<HostEnv> {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl<E: EnvLookup> Parser<E> {
    /// Create a parser that resolves `$NAME` fallbacks against `env`.
    pub fn with_env(options: ParseOptions, env: E) -> Self {
        Self { options, env }
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn parse_lines<I, S>(&self, lines: I) -> Vars
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parse_lines_with_diagnostics(lines).vars
    }

    /// Parse lines in order. Each accepted line is committed before the next
    /// one is read, so later values can reference earlier keys.
    pub fn parse_lines_with_diagnostics<I, S>(&self, lines: I) -> Parsed
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Parsed::default();

        for (idx, line) in lines.into_iter().enumerate() {
            let line_num = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            let Some(entry) = self.parse_line(
                line.as_ref(),
                line_num,
                &parsed.vars,
                &mut parsed.diagnostics,
            ) else {
                continue;
            };

            if parsed.vars.contains_key(&entry.key) {
                debug!(key = %entry.key, line = line_num, "overwriting duplicate key");
            } else {
                trace!(key = %entry.key, line = line_num, "parsed entry");
            }
            parsed.vars.insert(entry);
        }

        parsed
    }

    pub fn parse_str(&self, input: &str) -> Vars {
        self.parse_lines(input.lines())
    }

    pub fn parse_bytes(&self, input: &[u8]) -> Result<Vars, Error> {
        let text = std::str::from_utf8(input)?;
        Ok(self.parse_str(text))
    }

    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<Vars, Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.parse_bytes(&buf)
    }

    fn parse_line(
        &self,
        line: &str,
        line_num: u32,
        vars: &Vars,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Entry> {
        if is_comment(line) {
            return None;
        }

        let line = strip_export(line);
        let Some((key, value)) = split_key_value(line) else {
            if !line.trim().is_empty() {
                debug!(line = line_num, "skipping line without `=`");
                diagnostics.push(Diagnostic::new(line_num, DiagnosticKind::MissingSeparator));
            }
            return None;
        };

        let (mut key, mut value) = (key, value);
        if self.options.embedded_hash_comment() {
            value = remove_inline_comment(value);
        }
        if self.options.trim_whitespace() {
            key = key.trim();
            value = value.trim();
        }

        let value = if self.options.unescape_quoted_values() && is_quoted(value) {
            unescape(&value[1..value.len() - 1])
        } else {
            Cow::Borrowed(value)
        };

        let value = if self.options.parse_variables() {
            let expansion =
                expand_variables(&value, vars, &self.env, self.options.max_substitutions());
            if let Some(name) = expansion.truncated_at {
                diagnostics.push(Diagnostic::new(
                    line_num,
                    DiagnosticKind::SubstitutionLimit { name },
                ));
            }
            expansion.value.into_owned()
        } else {
            value.into_owned()
        };

        Some(Entry {
            key: key.to_owned(),
            value,
            line: line_num,
        })
    }
}

/// A line whose first non-whitespace character is `#`.
fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Drop a leading `export` keyword and the whitespace around it.
fn strip_export(line: &str) -> &str {
    match EXPORT_PREFIX.find(line) {
        Some(found) => &line[found.end()..],
        None => line,
    }
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    line.split_once('=')
}

/// The span from the first to the last `quote`, inclusive, or `input` itself
/// when it contains no `quote`.
fn quoted_span(input: &str, quote: char) -> &str {
    match (input.find(quote), input.rfind(quote)) {
        (Some(start), Some(end)) => &input[start..end + quote.len_utf8()],
        _ => input,
    }
}

/// Strip a trailing `# comment` unless the value is quoted.
///
/// The quoted part is located by taking the outermost `"` span and then the
/// outermost `'` span inside it. This is a heuristic: a value mixing an
/// unbalanced quote with a comment keeps the comment. A quoted span is
/// returned on its own; an unquoted value without `#` is returned as given.
fn remove_inline_comment(value: &str) -> &str {
    let span = quoted_span(value, '"');
    let span = quoted_span(span, '\'');

    if is_quoted(span) {
        return span;
    }

    match span.find('#') {
        Some(pos) => &span[..pos],
        None => value,
    }
}

/// Longer than one character and wrapped in a matching pair of `"` or `'`.
fn is_quoted(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) if bytes.len() > 1 => {
            first == last && (first == b'"' || first == b'\'')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn parser() -> Parser<HostEnv> {
        Parser::with_env(ParseOptions::default(), HostEnv::empty())
    }

    fn parse(input: &str) -> Vars {
        parser().parse_str(input)
    }

    #[test]
    fn detects_comment_lines() {
        assert!(is_comment("# comment"));
        assert!(is_comment("   \t# indented"));
        assert!(is_comment("#A=1"));
        assert!(!is_comment("A=1 # trailing"));
        assert!(!is_comment(""));
    }

    #[test]
    fn strips_export_prefix_only_at_start() {
        assert_eq!(strip_export("export A=1"), "A=1");
        assert_eq!(strip_export("  export\t  A=1"), "A=1");
        assert_eq!(strip_export("exportA=1"), "exportA=1");
        assert_eq!(strip_export("A=export B"), "A=export B");
        assert_eq!(strip_export("export"), "export");
    }

    #[test]
    fn splits_on_first_equals() {
        assert_eq!(split_key_value("A=b=c"), Some(("A", "b=c")));
        assert_eq!(split_key_value("A="), Some(("A", "")));
        assert_eq!(split_key_value("=v"), Some(("", "v")));
        assert_eq!(split_key_value("no separator"), None);
    }

    #[test]
    fn quote_detection_requires_matching_pair() {
        assert!(is_quoted("\"\""));
        assert!(is_quoted("'a'"));
        assert!(!is_quoted("\""));
        assert!(!is_quoted("'a\""));
        assert!(!is_quoted("a"));
        assert!(!is_quoted(""));
    }

    #[test]
    fn inline_comment_removal() {
        assert_eq!(remove_inline_comment("1 # comment"), "1 ");
        assert_eq!(remove_inline_comment("a#b"), "a");
        assert_eq!(remove_inline_comment("plain"), "plain");
        assert_eq!(remove_inline_comment(" \"1 # kept\" # dropped"), "\"1 # kept\"");
        assert_eq!(remove_inline_comment("'single # kept'"), "'single # kept'");
    }

    #[test]
    fn inline_comment_heuristic_keeps_unbalanced_quote_values() {
        // A lone quote hides the comment from the heuristic.
        assert_eq!(remove_inline_comment("abc\"def # x"), "abc\"def # x");
        assert_eq!(remove_inline_comment("'it\"s' # x"), "'it\"s' # x");
        // Single quotes nested in a double-quoted span narrow the span.
        assert_eq!(remove_inline_comment("\"a 'b' c\" # x"), "'b'");
    }

    #[test]
    fn parses_basic_values_and_comments() {
        let vars = parse("A=1\nB = 2\n# skip\nC=hello # comment\nD=\n");

        assert_eq!(
            vars.iter().collect::<Vec<_>>(),
            [("A", "1"), ("B", "2"), ("C", "hello"), ("D", "")]
        );
    }

    #[test]
    fn export_and_plain_lines_are_equivalent() {
        let exported = parse("export FOO=bar\n");
        let plain = parse("FOO=bar\n");
        assert_eq!(exported.get("FOO"), Some("bar"));
        assert_eq!(exported.iter().collect::<Vec<_>>(), plain.iter().collect::<Vec<_>>());
    }

    #[test]
    fn commented_export_is_skipped() {
        assert!(parse("# export A=1\n  #B=2\n").is_empty());
    }

    #[test]
    fn lines_without_equals_are_reported_and_skipped() {
        let parsed = parser().parse_lines_with_diagnostics(["A=1", "", "garbage", "export B", "C=3"]);

        assert_eq!(parsed.vars.keys().collect::<Vec<_>>(), ["A", "C"]);
        assert_eq!(
            parsed.diagnostics,
            [
                Diagnostic::new(3, DiagnosticKind::MissingSeparator),
                Diagnostic::new(4, DiagnosticKind::MissingSeparator),
            ]
        );
    }

    #[test]
    fn quoted_values_are_unescaped() {
        let vars = parse("NL=\"a\\nb\"\nU='\\u0041'\nEMPTY=\"\"\nRAW=a\\nb\n");

        assert_eq!(vars.get("NL"), Some("a\nb"));
        assert_eq!(vars.get("U"), Some("A"));
        assert_eq!(vars.get("EMPTY"), Some(""));
        // Unquoted values are not decoded.
        assert_eq!(vars.get("RAW"), Some("a\\nb"));
    }

    #[test]
    fn hash_inside_quotes_is_kept() {
        let vars = parse("A=\"1 # not a comment\"\nB='x#y' # comment\n");
        assert_eq!(vars.get("A"), Some("1 # not a comment"));
        assert_eq!(vars.get("B"), Some("x#y"));
    }

    #[test]
    fn substitutes_earlier_values_and_environment() {
        let env = BTreeMap::from([("HOME".to_owned(), "/home/me".to_owned())]);
        let parser = Parser::with_env(ParseOptions::default(), env);
        let vars = parser.parse_str("A=1\nB=$A\nC=\"$HOME/$A\"\nD=$UNSET_NAME\nE='$A'\n");

        assert_eq!(vars.get("B"), Some("1"));
        assert_eq!(vars.get("C"), Some("/home/me/1"));
        assert_eq!(vars.get("D"), Some(""));
        assert_eq!(vars.get("E"), Some("1"));
    }

    #[test]
    fn substitution_sees_only_earlier_lines() {
        let vars = parse("A=$B\nB=2\n");
        assert_eq!(vars.get("A"), Some(""));
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let vars = parse("A=1\nB=x\nA=2\nC=$A\n");

        assert_eq!(vars.iter().collect::<Vec<_>>(), [("A", "2"), ("B", "x"), ("C", "2")]);
        assert_eq!(vars.get_entry("A").map(|entry| entry.line), Some(3));
    }

    #[test]
    fn self_reference_extends_environment_value() {
        let env = BTreeMap::from([("PATH".to_owned(), "/bin".to_owned())]);
        let vars = Parser::with_env(ParseOptions::default(), env).parse_str("PATH=$PATH:/opt/bin");
        assert_eq!(vars.get("PATH"), Some("/bin:/opt/bin"));
    }

    #[test]
    fn substitution_limit_is_reported() {
        let env = BTreeMap::from([("LOOP".to_owned(), "x$LOOP".to_owned())]);
        let options = ParseOptions::default().with_max_substitutions(4);
        let parsed = Parser::with_env(options, env).parse_lines_with_diagnostics(["A=$LOOP"]);

        assert_eq!(parsed.vars.get("A"), Some("xxxx$LOOP"));
        assert_eq!(
            parsed.diagnostics,
            [Diagnostic::new(
                1,
                DiagnosticKind::SubstitutionLimit {
                    name: "LOOP".to_owned()
                }
            )]
        );
    }

    #[test]
    fn disabled_stages_leave_text_alone() {
        let input = " A = \"$B\\n\" # note";

        let no_variables = Parser::with_env(
            ParseOptions::default().with_parse_variables(false),
            HostEnv::empty(),
        );
        assert_eq!(no_variables.parse_str("A=$FOO").get("A"), Some("$FOO"));

        let no_trim = Parser::with_env(
            ParseOptions::default().with_trim_whitespace(false),
            HostEnv::empty(),
        );
        let vars = no_trim.parse_str(input);
        assert_eq!(vars.get(" A "), Some("\n"));

        let no_comments = Parser::with_env(
            ParseOptions::default().with_embedded_hash_comment(false),
            HostEnv::empty(),
        );
        assert_eq!(no_comments.parse_str("A=1 # c").get("A"), Some("1 # c"));

        let no_unescape = Parser::with_env(
            ParseOptions::default()
                .with_unescape_quoted_values(false)
                .with_parse_variables(false),
            HostEnv::empty(),
        );
        assert_eq!(no_unescape.parse_str(input).get("A"), Some("\"$B\\n\""));

        let raw = Parser::with_env(ParseOptions::raw(), HostEnv::empty());
        assert_eq!(raw.parse_str(input).get(" A "), Some(" \"$B\\n\" # note"));
    }

    #[test]
    fn values_may_contain_equals_and_empty_keys_are_kept() {
        let vars = parse("URL=postgres://u:p@host/db?sslmode=require\n=orphan\n");
        assert_eq!(vars.get("URL"), Some("postgres://u:p@host/db?sslmode=require"));
        assert_eq!(vars.get(""), Some("orphan"));
    }

    #[test]
    fn splits_crlf_input() {
        let vars = parse("A=1\r\nB=\"two\"\r\n");
        assert_eq!(vars.get("A"), Some("1"));
        assert_eq!(vars.get("B"), Some("two"));
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let bytes: Vec<u8> = vec![b'A', b'=', 0xff];
        let err = parser().parse_bytes(&bytes).expect_err("expected encoding error");
        assert!(matches!(err, Error::InvalidEncoding(_)));
    }

    #[test]
    fn parse_reader_reads_everything() {
        let reader = std::io::Cursor::new("A=1\nB=$A$A\n");
        let vars = parser().parse_reader(reader).expect("reader should parse");
        assert_eq!(vars.get("B"), Some("11"));
    }
}
