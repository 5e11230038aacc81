use crate::error::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

fn binding_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<source>[^\[]+?)\s*(?:\[\s*(?P<keys>[^\]]*)\s*\])?\s*->\s*(?P<destination>.+?)\s*$")
            .expect("static binding pattern compiles")
    })
}

fn shovel_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<subscription>.+?)\s*->\s*(?P<publication>.+?)\s*$")
            .expect("static shovel pattern compiles")
    })
}

/// Splits `source[ key1, key2 ]-> destination` into its source,
/// destination and a de-duplicated, order-preserving list of binding
/// keys (comma- or whitespace-separated).
pub struct ParsedBindingName {
    pub source: String,
    pub destination: String,
    pub keys: Vec<String>,
}

pub fn parse_binding_name(name: &str) -> Result<ParsedBindingName, ConfigError> {
    let captures = binding_pattern()
        .captures(name)
        .ok_or_else(|| ConfigError::MalformedBindingName(name.to_string()))?;

    let source = captures["source"].trim().to_string();
    let destination = captures["destination"].trim().to_string();
    let keys = captures
        .name("keys")
        .map(|m| split_keys(m.as_str()))
        .unwrap_or_default();

    if source.is_empty() || destination.is_empty() {
        return Err(ConfigError::MalformedBindingName(name.to_string()));
    }

    Ok(ParsedBindingName {
        source,
        destination,
        keys,
    })
}

fn split_keys(raw: &str) -> Vec<String> {
    let parts: Vec<&str> = if raw.contains(',') {
        raw.split(',').collect()
    } else {
        raw.split_whitespace().collect()
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for part in parts {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

pub struct ParsedShovelName {
    pub subscription: String,
    pub publication: String,
}

pub fn parse_shovel_name(name: &str) -> Option<ParsedShovelName> {
    let captures = shovel_pattern().captures(name)?;
    Some(ParsedShovelName {
        subscription: captures["subscription"].trim().to_string(),
        publication: captures["publication"].trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binding_with_no_keys() {
        let parsed = parse_binding_name("e1 -> q1").unwrap();
        assert_eq!(parsed.source, "e1");
        assert_eq!(parsed.destination, "q1");
        assert!(parsed.keys.is_empty());
    }

    #[test]
    fn parses_binding_with_comma_separated_keys() {
        let parsed = parse_binding_name("e1[ k1, k2 ]-> q1").unwrap();
        assert_eq!(parsed.source, "e1");
        assert_eq!(parsed.destination, "q1");
        assert_eq!(parsed.keys, vec!["k1", "k2"]);
    }

    #[test]
    fn parses_binding_with_whitespace_separated_keys() {
        let parsed = parse_binding_name("e1[ k1 k2 k3 ]-> q1").unwrap();
        assert_eq!(parsed.keys, vec!["k1", "k2", "k3"]);
    }

    #[test]
    fn parses_shovel_name() {
        let parsed = parse_shovel_name("s1 -> p1").unwrap();
        assert_eq!(parsed.subscription, "s1");
        assert_eq!(parsed.publication, "p1");
    }
}
