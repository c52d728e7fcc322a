use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

static UUID_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("static uuid pattern")
});

/// First lowercase canonical UUID embedded in `text`.
pub fn get_uuid(text: &str) -> Option<&str> {
    UUID_LIKE.find(text).map(|m| m.as_str())
}

/// Deterministic name-based (v3, OID namespace) UUID for `name`.
pub fn generate_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Random v4 UUID.
pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_uuid_from_path() {
        let text = "/v2/servers/3f2504e0-4f89-11d3-9a0c-0305e82c3301/action";
        assert_eq!(get_uuid(text), Some("3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
    }

    #[test]
    fn uppercase_or_missing_uuid_is_none() {
        assert_eq!(get_uuid("3F2504E0-4F89-11D3-9A0C-0305E82C3301"), None);
        assert_eq!(get_uuid("no id"), None);
    }

    #[test]
    fn generated_uuid_is_stable_v3() {
        let a = generate_uuid("compute-01");
        let b = generate_uuid("compute-01");
        let c = generate_uuid("compute-02");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 3);
        assert_eq!(get_uuid(&a.to_string()), Some(a.to_string().as_str()));
    }
}
