//! Input expansion
//!
//! Every input is a file, a directory, or a glob pattern. Directories
//! contribute their `*.xml` files (any case), recursively with `recurse`.
//! Patterns are matched with `globset` over a `walkdir` traversal rooted at
//! the pattern's literal prefix.

use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Expand all inputs, keeping first-seen order and dropping repeats.
pub fn discover_inputs<S: AsRef<str>>(inputs: &[S], recurse: bool) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in inputs {
        for path in expand_input(input.as_ref(), recurse)? {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }
    if files.is_empty() {
        warn!("No input files to process!");
    }
    Ok(files)
}

/// Expand one input into the XML files it names.
pub fn expand_input(input: &str, recurse: bool) -> Result<Vec<PathBuf>> {
    let path = expand_tilde(input);
    if path.is_file() {
        return Ok(vec![path]);
    }
    if path.is_dir() {
        return Ok(xml_files_in(&path, recurse));
    }

    let pattern = path.to_string_lossy().into_owned();
    if !is_pattern(&pattern) {
        return Err(Error::input(input, "no such file or directory"));
    }

    let mut files = Vec::new();
    for matched in glob_matches(input, &pattern)? {
        if matched.is_file() {
            files.push(matched);
        } else if matched.is_dir() {
            files.extend(xml_files_in(&matched, recurse));
        }
    }
    if files.is_empty() {
        return Err(Error::input(input, "pattern matches no files"));
    }
    debug!(input, file_count = files.len(), "Expanded input pattern");
    Ok(files)
}

fn expand_tilde(input: &str) -> PathBuf {
    expand_tilde_in(input, dirs::home_dir())
}

/// `~` and `~/...` resolved against `home`; anything else is taken literally.
fn expand_tilde_in(input: &str, home: Option<PathBuf>) -> PathBuf {
    match (input.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with(['/', std::path::MAIN_SEPARATOR]) => home.join(&rest[1..]),
        _ => PathBuf::from(input),
    }
}

fn is_pattern(text: &str) -> bool {
    text.contains(['*', '?', '[', '{'])
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// `*.xml` files directly in `dir`, or anywhere below it with `recurse`.
fn xml_files_in(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let max_depth = if recurse { usize::MAX } else { 1 };
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_xml(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Paths matching `pattern`, files and directories alike.
fn glob_matches(input: &str, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::input(input, format!("invalid glob pattern: {e}")))?
        .compile_matcher();

    let pattern_path = Path::new(pattern);
    let literal: PathBuf = pattern_path
        .components()
        .take_while(|component| !is_pattern(&component.as_os_str().to_string_lossy()))
        .collect();
    let relative_to_cwd = literal.as_os_str().is_empty();
    let root = if relative_to_cwd {
        PathBuf::from(".")
    } else {
        literal.clone()
    };

    let max_depth = if pattern.contains("**") {
        usize::MAX
    } else {
        pattern_path.components().count() - literal.components().count()
    };

    let mut matches = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        let candidate = if relative_to_cwd {
            strip_current_dir(entry.path())
        } else {
            entry.path().to_path_buf()
        };
        if matcher.is_match(&candidate) {
            matches.push(candidate);
        }
    }
    Ok(matches)
}

fn strip_current_dir(path: &Path) -> PathBuf {
    path.components()
        .skip_while(|component| matches!(component, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "<?xml version=\"1.0\"?>\n<a/>\n").unwrap();
    }

    #[test]
    fn test_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.txt");
        touch(&file);
        assert_eq!(expand_input(file.to_str().unwrap(), false).unwrap(), vec![file]);
    }

    #[test]
    fn test_directory_input_matches_xml_any_case() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.xml"));
        touch(&dir.path().join("b.XML"));
        touch(&dir.path().join("c.txt"));
        touch(&dir.path().join("sub").join("d.xml"));

        let files = expand_input(dir.path().to_str().unwrap(), false).unwrap();
        assert_eq!(files, vec![dir.path().join("a.xml"), dir.path().join("b.XML")]);

        let files = expand_input(dir.path().to_str().unwrap(), true).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.contains(&dir.path().join("sub").join("d.xml")));
    }

    #[test]
    fn test_glob_input() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("2001.xml"));
        touch(&dir.path().join("2002.xml"));
        touch(&dir.path().join("notes.txt"));

        let pattern = format!("{}/20*.xml", dir.path().display());
        let files = expand_input(&pattern, false).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("2001.xml"), dir.path().join("2002.xml")]
        );
    }

    #[test]
    fn test_glob_matching_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("batch1").join("a.xml"));
        touch(&dir.path().join("batch2").join("b.xml"));

        let pattern = format!("{}/batch*", dir.path().display());
        let files = expand_input(&pattern, false).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_missing_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xml");
        assert!(matches!(
            expand_input(missing.to_str().unwrap(), false),
            Err(Error::Input { .. })
        ));

        let pattern = format!("{}/*.xml", dir.path().display());
        assert!(matches!(
            expand_input(&pattern, false),
            Err(Error::Input { .. })
        ));
    }

    #[test]
    fn test_discover_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.xml");
        touch(&file);
        let input = file.to_str().unwrap().to_string();
        let files = discover_inputs(&[input.clone(), input], false).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/data"), home.join("data"));
            assert_eq!(expand_tilde("~"), home);
        }
        assert_eq!(expand_tilde("data/~x"), PathBuf::from("data/~x"));
    }

    #[test]
    fn test_tilde_resolves_against_home_directory() {
        let home = tempfile::tempdir().unwrap();
        touch(&home.path().join("a.xml"));

        let expanded = expand_tilde_in("~/a.xml", Some(home.path().to_path_buf()));
        assert_eq!(expanded, home.path().join("a.xml"));
        assert!(expanded.is_file());
        assert_eq!(expand_tilde_in("~/a.xml", None), PathBuf::from("~/a.xml"));
        assert_eq!(expand_tilde_in("~other/a.xml", Some(home.path().to_path_buf())), PathBuf::from("~other/a.xml"));
    }
}
