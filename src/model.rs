/// Upper bound on `$NAME` replacements performed for a single value.
pub const DEFAULT_MAX_SUBSTITUTIONS: usize = 1024;

/// A committed `KEY=VALUE` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    /// 1-based number of the input line that last set this key.
    pub line: u32,
}

/// Switches for the optional parsing stages.
///
/// Every stage is enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    trim_whitespace: bool,
    embedded_hash_comment: bool,
    unescape_quoted_values: bool,
    parse_variables: bool,
    max_substitutions: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trim_whitespace: true,
            embedded_hash_comment: true,
            unescape_quoted_values: true,
            parse_variables: true,
            max_substitutions: DEFAULT_MAX_SUBSTITUTIONS,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with every optional stage disabled.
    ///
    /// Lines are still filtered for comments, `export` prefixes and a missing
    /// `=`, but keys and values are committed exactly as split.
    pub fn raw() -> Self {
        Self {
            trim_whitespace: false,
            embedded_hash_comment: false,
            unescape_quoted_values: false,
            parse_variables: false,
            max_substitutions: DEFAULT_MAX_SUBSTITUTIONS,
        }
    }

    /// Trim surrounding whitespace from keys and values.
    pub fn with_trim_whitespace(mut self, enabled: bool) -> Self {
        self.trim_whitespace = enabled;
        self
    }

    /// Strip trailing `# comment` text from unquoted values.
    pub fn with_embedded_hash_comment(mut self, enabled: bool) -> Self {
        self.embedded_hash_comment = enabled;
        self
    }

    /// Remove enclosing quotes and decode backslash escapes.
    pub fn with_unescape_quoted_values(mut self, enabled: bool) -> Self {
        self.unescape_quoted_values = enabled;
        self
    }

    /// Expand `$NAME` references.
    pub fn with_parse_variables(mut self, enabled: bool) -> Self {
        self.parse_variables = enabled;
        self
    }

    pub fn with_max_substitutions(mut self, limit: usize) -> Self {
        self.max_substitutions = limit;
        self
    }

    pub fn trim_whitespace(&self) -> bool {
        self.trim_whitespace
    }

    pub fn embedded_hash_comment(&self) -> bool {
        self.embedded_hash_comment
    }

    pub fn unescape_quoted_values(&self) -> bool {
        self.unescape_quoted_values
    }

    pub fn parse_variables(&self) -> bool {
        self.parse_variables
    }

    pub fn max_substitutions(&self) -> usize {
        self.max_substitutions
    }
}
