//! Frontmatter extraction from Markdown documents.
//!
//! Supported fences:
//!
//! ```text
//! ---            +++            {
//! title: YAML    title = "TOML"   "title": "JSON"
//! ---            +++            }
//! body           body           body
//! ```

use crate::format::{DataFormat, FormatError};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("unterminated `{0}` frontmatter block")]
    Unterminated(&'static str),

    #[error("frontmatter must be a map, found {0}")]
    NotAMap(&'static str),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Extract the frontmatter map of `text`, or `None` when there is none.
pub fn extract(text: &str) -> Result<Option<Value>, FrontmatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = text.trim_start_matches(['\n', '\r', ' ', '\t']);

    let value = if let Some(block) = fenced(text, "---")? {
        DataFormat::Yaml.parse(block)?
    } else if let Some(block) = fenced(text, "+++")? {
        DataFormat::Toml.parse(block)?
    } else if text.starts_with('{') {
        leading_json(text)?
    } else {
        return Ok(None);
    };

    match value {
        Value::Object(_) => Ok(Some(value)),
        // an empty `---\n---` block
        Value::Null => Ok(Some(Value::Object(Default::default()))),
        other => Err(FrontmatterError::NotAMap(crate::directive::json_kind(&other))),
    }
}

/// Text between an opening fence line and the next closing fence line.
fn fenced<'a>(text: &'a str, fence: &'static str) -> Result<Option<&'a str>, FrontmatterError> {
    let Some(rest) = text.strip_prefix(fence) else {
        return Ok(None);
    };
    let Some(rest) = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
    else {
        return Ok(None);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            return Ok(Some(&rest[..offset]));
        }
        offset += line.len();
    }
    Err(FrontmatterError::Unterminated(fence))
}

/// First JSON object in `text`; anything after it is body.
fn leading_json(text: &str) -> Result<Value, FrontmatterError> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(value) => Ok(value.map_err(FormatError::from)?),
        None => Ok(Value::Null),
    }
}
