// Entry filtering for remote directory walks

/// Names skipped while walking a remote directory.
///
/// Patterns are matched against the bare entry name, not the full path.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub exclude: Vec<String>,
}

impl EntryFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if an entry should be walked
    pub fn should_include(&self, name: &str) -> bool {
        !self.exclude.iter().any(|pattern| glob_match(pattern, name))
    }

}

/// Whether `glob_match` gives `pattern` its wildcard meaning.
///
/// Only a leading and/or trailing `*` is understood; `a*b` would be compared
/// literally, so configuration rejects it up front.
pub fn is_supported_pattern(pattern: &str) -> bool {
    !pattern
        .trim_start_matches('*')
        .trim_end_matches('*')
        .contains('*')
}

/// Simple glob matching (supports leading and trailing * wildcards)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.contains('*') {
        if pattern.len() >= 2 && pattern.starts_with('*') && pattern.ends_with('*') {
            let middle = &pattern[1..pattern.len() - 1];
            return text.contains(middle);
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            return text.ends_with(suffix);
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            return text.starts_with(prefix);
        }
    }

    pattern == text
}
