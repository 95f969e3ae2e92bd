use crate::Result;
use std::path::Path;

/// Read the source file into the per-run line batch.
///
/// Lines are trimmed of surrounding whitespace; blank lines are discarded
/// before queueing. The whole file is read once at run start.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn blank_lines_are_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.txt");
        fs::write(&path, "ERROR a\n\nINFO b\n").unwrap();

        let lines = load_lines(&path).unwrap();
        assert_eq!(lines, vec!["ERROR a", "INFO b"]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.txt");
        fs::write(&path, "  ERROR a  \n\t\nINFO b\t\n   \n").unwrap();

        let lines = load_lines(&path).unwrap();
        assert_eq!(lines, vec!["ERROR a", "INFO b"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_lines(&dir.path().join("absent.txt")).is_err());
    }
}
