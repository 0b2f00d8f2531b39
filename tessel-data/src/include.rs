/// Shape of a navigation property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// One-to-many: a list of related rows.
    Collection,
    /// Many-to-one or one-to-one: a single related row.
    Reference,
}

impl std::fmt::Display for NavigationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationKind::Collection => f.write_str("collection"),
            NavigationKind::Reference => f.write_str("reference"),
        }
    }
}

/// Split a comma-separated list of navigation names, trimming each name and
/// dropping empty entries.
pub fn parse_include_paths(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims() {
        assert_eq!(parse_include_paths("posts, author ,tags"), vec!["posts", "author", "tags"]);
    }

    #[test]
    fn drops_empty_entries() {
        assert_eq!(parse_include_paths(",posts,, ,"), vec!["posts"]);
        assert!(parse_include_paths("").is_empty());
    }
}
