//! `.env` file loading.
//!
//! Accepts `KEY=VALUE` lines, optional `export ` prefixes, `#` comments and
//! single or double quoted values.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{HarnessError, Result};

pub fn parse(contents: &str) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            return Err(HarnessError::Config(format!(
                "invalid env file line {}: {raw}",
                index + 1
            )));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(HarnessError::Config(format!(
                "empty key on env file line {}",
                index + 1
            )));
        }

        vars.insert(key.to_string(), unquote(value.trim()));
    }

    Ok(vars)
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    // strip trailing inline comment on unquoted values
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}

pub fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        HarnessError::Config(format!("failed to read env file {}: {e}", path.display()))
    })?;
    parse(&contents)
}
