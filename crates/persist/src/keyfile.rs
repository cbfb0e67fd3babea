//! A minimal INI-like key-value format: `[section]` headers followed by
//! `key=value` lines, blank lines and `#` comments ignored. Used as the
//! on-disk encoding for [`crate::Stream::save`] / [`crate::Stream::load`].

use facq_core::{Error, Result};

use crate::catalog::ParamMap;

/// One `[header]` block and the `key=value` pairs under it.
#[derive(Debug, Clone)]
pub struct Section {
    /// The raw text between `[` and `]`, e.g. `"Stream"` or `"software,0"`.
    pub header: String,
    /// The block's parameters, in no particular order.
    pub params: ParamMap,
}

/// Parses `text` into an ordered list of sections.
pub fn parse(text: &str) -> Result<Vec<Section>> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                header: header.to_string(),
                params: ParamMap::new(),
            });
            continue;
        }
        let Some(section) = current.as_mut() else {
            return Err(Error::Config(format!(
                "line {}: key=value outside of any [section]",
                lineno + 1
            )));
        };
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::Config(format!(
                "line {}: expected 'key=value'",
                lineno + 1
            )));
        };
        section
            .params
            .insert(key.trim().to_string(), value.trim().to_string());
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }
    Ok(sections)
}

/// Renders `sections` back to text, in order.
pub fn serialize(sections: &[Section]) -> String {
    let mut out = String::new();
    for section in sections {
        out.push('[');
        out.push_str(&section.header);
        out.push_str("]\n");
        for (key, value) in &section.params {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let mut params = ParamMap::new();
        params.insert("amplitude".into(), "5".into());
        params.insert("function".into(), "sine".into());
        let sections = vec![Section {
            header: "software,0".into(),
            params,
        }];
        let text = serialize(&sections);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].header, "software,0");
        assert_eq!(parsed[0].params.get("amplitude").map(String::as_str), Some("5"));
    }

    #[test]
    fn blank_lines_and_comments_are_ignored() {
        let text = "# a comment\n\n[Stream]\nname=demo\n\n# trailing\n";
        let sections = parse(text).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].params.get("name").map(String::as_str), Some("demo"));
    }

    #[test]
    fn key_before_any_section_is_rejected() {
        assert!(parse("name=demo\n").is_err());
    }

    #[test]
    fn line_without_equals_is_rejected() {
        assert!(parse("[Stream]\nname\n").is_err());
    }
}
