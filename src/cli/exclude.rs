//! Image exclusion lists from flags and files.

use crate::config::ArgumentError;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Tags listed in an exclude file: one per line, blank lines and lines
/// starting with `#` ignored.
pub fn parse_exclude_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Merge tags given on the command line with the contents of an exclude file.
pub fn build_exclude_set<S: AsRef<str>>(
    image_tags: &[S],
    exclude_file: Option<&Path>,
) -> Result<BTreeSet<String>, ArgumentError> {
    let mut exclude_set: BTreeSet<String> =
        image_tags.iter().map(|t| t.as_ref().to_string()).collect();

    if let Some(path) = exclude_file {
        let content = fs::read_to_string(path).map_err(|source| ArgumentError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        exclude_set.extend(parse_exclude_lines(&content).map(str::to_string));
    }

    Ok(exclude_set)
}
