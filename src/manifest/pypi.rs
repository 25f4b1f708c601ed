//! `requirements.txt` extraction.

use crate::traits::{ExtractionError, ManifestExtractor};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

pub const REQUIREMENTS_FILE: &str = "requirements.txt";

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)").expect("valid name regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("valid url regex"));

static EGG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#egg=([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)").expect("valid egg regex")
});

/// Reads bare package names from pip requirement files, dropping extras,
/// version specifiers, direct references and environment markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PypiExtractor;

impl ManifestExtractor for PypiExtractor {
    fn manifest_name(&self) -> &'static str {
        REQUIREMENTS_FILE
    }

    fn parse(&self, _path: &Path, content: &str) -> Result<Vec<String>, ExtractionError> {
        Ok(logical_lines(content)
            .iter()
            .filter_map(|line| requirement_name(line))
            .collect())
    }
}

/// Joins backslash continuations into single logical lines.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();

    for line in content.lines() {
        match line.trim_end().strip_suffix('\\') {
            Some(head) => pending.push_str(head),
            None => {
                pending.push_str(line);
                lines.push(std::mem::take(&mut pending));
            }
        }
    }
    if !pending.is_empty() {
        lines.push(pending);
    }
    lines
}

fn requirement_name(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    // `#egg=` fragments have no leading whitespace, inline comments do.
    let line = match line.find(" #").or_else(|| line.find("\t#")) {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    };

    if line.starts_with('-') {
        if line.starts_with("-e") || line.starts_with("--editable") {
            return egg_name(line);
        }
        return None;
    }

    if URL_RE.is_match(line) || line.starts_with('.') || line.starts_with('/') {
        return egg_name(line);
    }

    NAME_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn egg_name(line: &str) -> Option<String> {
    EGG_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn names(content: &str) -> Vec<String> {
        PypiExtractor
            .parse(Path::new(REQUIREMENTS_FILE), content)
            .unwrap()
    }

    #[test]
    fn test_pinned_requirement() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(REQUIREMENTS_FILE), "flask==2.0.1\n").unwrap();

        let ids = PypiExtractor.extract(dir.path(), false).unwrap();
        assert_eq!(ids, BTreeSet::from(["flask".to_string()]));
    }

    #[test]
    fn test_specifiers_extras_and_markers_are_dropped() {
        let content = "\
requests[security,socks]>=2.8.1,<3
Django ~= 4.2
zope.interface
typing_extensions; python_version < \"3.8\"
internal-lib @ https://git.example.com/internal-lib.tar.gz
";
        assert_eq!(
            names(content),
            vec!["requests", "Django", "zope.interface", "typing_extensions", "internal-lib"]
        );
    }

    #[test]
    fn test_comments_options_and_blank_lines_are_skipped() {
        let content = "\
# production deps
--index-url https://pypi.example.com/simple
-r base.txt
-c constraints.txt

numpy==1.26.0  # pinned for ABI
";
        assert_eq!(names(content), vec!["numpy"]);
    }

    #[test]
    fn test_editable_and_url_entries_use_egg_name() {
        let content = "\
-e git+https://git.example.com/corp/secret-sauce.git#egg=secret-sauce
https://files.example.com/pkg.zip#egg=zipped_pkg
./local/path
-e .
";
        assert_eq!(names(content), vec!["secret-sauce", "zipped_pkg"]);
    }

    #[test]
    fn test_line_continuation() {
        let content = "cryptography==41.0.0 \\\n    --hash=sha256:abc\nattrs\n";
        assert_eq!(names(content), vec!["cryptography", "attrs"]);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        assert!(names("").is_empty());
        assert!(names("\n# only comments\n").is_empty());
    }

    #[test]
    fn test_recursive_union_collapses_duplicates() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("service")).unwrap();
        fs::write(dir.path().join(REQUIREMENTS_FILE), "flask==2.0.1\nrequests\n").unwrap();
        fs::write(
            dir.path().join("service").join(REQUIREMENTS_FILE),
            "flask>=2\ninternal-utils\n",
        )
        .unwrap();

        let ids = PypiExtractor.extract(dir.path(), true).unwrap();
        let expected: BTreeSet<String> = ["flask", "internal-utils", "requests"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ids, expected);
    }
}
