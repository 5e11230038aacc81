use crate::error::ConfigError;
use crate::names::parse_shovel_name;
use crate::value_ext::{get_str, merge_defaults, normalize_keyed_collection};
use serde_json::Value;
use std::collections::HashMap;
use topology::Shovel;

/// Expands the `shovels` keyed collection into `topology::Shovel`
/// entries. Each name is either an explicit `subscription -> publication`
/// pair, or the `subscription`/`publication` fields carried by the
/// entry itself win when the name doesn't parse as that shape.
pub fn expand_shovels(
    raw: Option<&Value>,
    defaults: &Value,
) -> Result<HashMap<String, Shovel>, ConfigError> {
    let entries = normalize_keyed_collection(raw);
    let mut out = HashMap::new();

    for (name, raw_entry) in entries {
        let merged = merge_defaults(&raw_entry, defaults);
        let obj = merged.as_object().expect("merged shovel is object");

        let (subscription, publication) = match (get_str(obj, "subscription"), get_str(obj, "publication")) {
            (Some(s), Some(p)) => (s.to_string(), p.to_string()),
            _ => {
                let parsed = parse_shovel_name(&name)
                    .ok_or_else(|| ConfigError::MalformedShovelName(name.clone()))?;
                (parsed.subscription, parsed.publication)
            }
        };

        out.insert(
            name.clone(),
            Shovel {
                name,
                subscription,
                publication,
            },
        );
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shovel_from_name() {
        let raw = serde_json::json!({ "s1 -> p1": {} });
        let shovels = expand_shovels(Some(&raw), &serde_json::json!({})).unwrap();
        let shovel = &shovels["s1 -> p1"];
        assert_eq!(shovel.subscription, "s1");
        assert_eq!(shovel.publication, "p1");
    }

    #[test]
    fn explicit_fields_win_over_name_parse() {
        let raw = serde_json::json!({ "my-shovel": { "subscription": "s2", "publication": "p2" } });
        let shovels = expand_shovels(Some(&raw), &serde_json::json!({})).unwrap();
        let shovel = &shovels["my-shovel"];
        assert_eq!(shovel.subscription, "s2");
        assert_eq!(shovel.publication, "p2");
    }

    #[test]
    fn malformed_shovel_name_is_rejected() {
        let raw = serde_json::json!({ "not-a-shovel": {} });
        let err = expand_shovels(Some(&raw), &serde_json::json!({})).unwrap_err();
        assert_eq!(err, ConfigError::MalformedShovelName("not-a-shovel".to_string()));
    }
}
