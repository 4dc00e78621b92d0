//! Substitution rule applied to every listed key.

/// Replaces one identifier with another wherever it appears in a key.
///
/// The substitution is a literal substring replace of **all** occurrences,
/// not a path-segment rename: a report name that shows up twice in a key
/// (CUR writes `{report}/{report}/...`) is rewritten twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameRule {
    pub old_identifier: String,
    pub new_identifier: String,
}

impl RenameRule {
    pub fn new(old_identifier: impl Into<String>, new_identifier: impl Into<String>) -> Self {
        Self {
            old_identifier: old_identifier.into(),
            new_identifier: new_identifier.into(),
        }
    }

    /// Compute the destination key for `key`.
    pub fn apply(&self, key: &str) -> String {
        key.replace(&self.old_identifier, &self.new_identifier)
    }

    /// True when `key` contains no occurrence of the old identifier, i.e.
    /// [`apply`](Self::apply) would return it unchanged.
    pub fn leaves_unchanged(&self, key: &str) -> bool {
        self.old_identifier == self.new_identifier || !key.contains(&self.old_identifier)
    }

    /// Conventional listing prefix: `{base_prefix}{old_identifier}/`.
    pub fn search_prefix(&self, base_prefix: &str) -> String {
        format!("{}{}/", base_prefix, self.old_identifier)
    }
}
