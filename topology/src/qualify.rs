/// Qualifies `name` against a vhost `namespace` and an optional tag
/// (used for `replyTo` queues, which get a per-process UUID tag folded
/// into their fully qualified name).
///
/// `qualify(_, "", _)` is the identity on `name` (plus tag); the empty
/// string exchange name is always returned unchanged, namespace or no.
pub fn qualify(name: &str, namespace: &str, tag: Option<&str>) -> String {
    if name.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    if !namespace.is_empty() {
        out.push_str(namespace);
        out.push(':');
    }
    out.push_str(name);
    if let Some(tag) = tag {
        out.push(':');
        out.push_str(tag);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_with_namespace() {
        assert_eq!(qualify("q1", "ns", None), "ns:q1");
    }

    #[test]
    fn qualifies_with_namespace_and_tag() {
        assert_eq!(qualify("q1", "ns", Some("abc")), "ns:q1:abc");
    }

    #[test]
    fn identity_with_empty_namespace() {
        assert_eq!(qualify("q1", "", None), "q1");
        assert_eq!(qualify("q1", "", Some("abc")), "q1:abc");
    }

    #[test]
    fn default_exchange_is_never_qualified() {
        assert_eq!(qualify("", "ns", None), "");
        assert_eq!(qualify("", "", None), "");
    }
}
