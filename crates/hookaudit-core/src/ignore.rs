use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Repositories excluded from reconciliation, one name per line in the
/// ignore file. A missing file means nothing is ignored.
///
/// Loaded once at loop start and passed into classification by value;
/// there is no lazy process-global behind this.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    repos: HashSet<String>,
}

impl IgnoreSet {
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let raw = fs::read_to_string(path).unwrap_or_default();
        Self {
            repos: raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, repository: &str) -> bool {
        self.repos.contains(repository)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_means_empty_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let set = IgnoreSet::load(&dir.path().join(".repoIgnore"));
        assert!(set.is_empty());
        assert!(!set.contains("anything"));
    }

    #[test]
    fn loads_trimmed_nonempty_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".repoIgnore");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "sandbox-repo").expect("write");
        writeln!(file, "  docs-playground  ").expect("write");
        writeln!(file).expect("write");
        drop(file);

        let set = IgnoreSet::load(&path);
        assert_eq!(set.len(), 2);
        assert!(set.contains("sandbox-repo"));
        assert!(set.contains("docs-playground"));
        assert!(!set.contains("real-repo"));
    }
}
