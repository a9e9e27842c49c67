/// Canonical form of a JSON policy document: object keys sorted, no insignificant whitespace.
pub fn normalize_policy_json(raw: &str) -> Result<String, serde_json::Error> {
    let parsed: serde_json::Value = serde_json::from_str(raw)?;
    serde_json::to_string(&parsed)
}

/// Whether two policy documents only differ by key order or whitespace.
/// Documents which are not JSON are compared as trimmed text.
pub fn policy_equivalent(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}
