//! DOCTYPE inspection and external DTD inlining

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{Error, Result};

static DOCTYPE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<!DOCTYPE\s+([^\s\[>]+)").expect("valid DOCTYPE pattern"));

static DOCTYPE_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!DOCTYPE\s+([^\s\[>]+)").expect("valid DOCTYPE pattern"));

static EXTERNAL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<!DOCTYPE\s+([^\s\[>]+)\s+(?:SYSTEM\s+(?:"([^"]*)"|'([^']*)')|PUBLIC\s+(?:"[^"]*"|'[^']*')\s+(?:"([^"]*)"|'([^']*)'))\s*"#,
    )
    .expect("valid external identifier pattern")
});

static TEXT_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>").expect("valid text declaration pattern"));

/// Check that the raw document text has a line starting with a DOCTYPE
/// declaration naming `expected_root`.
///
/// The first DOCTYPE line decides: naming another element is
/// [`Error::WrongDoctype`], no DOCTYPE line at all is [`Error::MissingDoctype`].
pub fn check_doctype(text: &str, expected_root: &str) -> Result<()> {
    for line in text.lines() {
        if !line.starts_with("<!DOCTYPE ") {
            continue;
        }
        let name = DOCTYPE_LINE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        if name == Some(expected_root) {
            return Ok(());
        }
        return Err(Error::WrongDoctype {
            declaration: line.trim_end().to_string(),
        });
    }

    Err(Error::MissingDoctype)
}

/// Name declared by the first DOCTYPE in `text`, wherever it appears.
pub fn doctype_name(text: &str) -> Option<&str> {
    DOCTYPE_ANYWHERE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Inline the external DTD subset referenced by the DOCTYPE into the
/// internal subset, resolving its system identifier against `dtd_dir`.
///
/// Documents without an external identifier are returned unchanged.
pub fn inline_external_dtd<'t>(text: &'t str, dtd_dir: &Path) -> Result<Cow<'t, str>> {
    let Some(caps) = EXTERNAL_ID.captures(text) else {
        return Ok(Cow::Borrowed(text));
    };
    let Some(whole) = caps.get(0) else {
        return Ok(Cow::Borrowed(text));
    };
    let name = caps.get(1).map_or("", |m| m.as_str());
    let Some(system_id) = [2, 3, 4, 5]
        .into_iter()
        .find_map(|group| caps.get(group))
        .map(|m| m.as_str())
    else {
        return Ok(Cow::Borrowed(text));
    };

    let dtd_file = resolve_system_id(dtd_dir, system_id);
    let declarations = std::fs::read_to_string(&dtd_file).map_err(|e| Error::Dtd {
        path: dtd_file.display().to_string(),
        message: e.to_string(),
    })?;
    let declarations = TEXT_DECLARATION.replace(&declarations, "");
    debug!(dtd = %dtd_file.display(), root = name, "Inlining external DTD");

    let rest = &text[whole.end()..];
    let mut inlined = String::with_capacity(text.len() + declarations.len() + 16);
    inlined.push_str(&text[..whole.start()]);
    inlined.push_str("<!DOCTYPE ");
    inlined.push_str(name);
    inlined.push_str(" [\n");
    inlined.push_str(&declarations);
    inlined.push('\n');

    if let Some(internal_subset) = rest.strip_prefix('[') {
        inlined.push_str(internal_subset);
    } else if let Some(after) = rest.strip_prefix('>') {
        inlined.push_str("]>");
        inlined.push_str(after);
    } else {
        return Err(Error::parse(format!("malformed DOCTYPE declaration for '{name}'")));
    }

    Ok(Cow::Owned(inlined))
}

fn resolve_system_id(dtd_dir: &Path, system_id: &str) -> PathBuf {
    if system_id.starts_with(&*dtd_dir.to_string_lossy()) {
        PathBuf::from(system_id)
    } else {
        dtd_dir.join(system_id)
    }
}
