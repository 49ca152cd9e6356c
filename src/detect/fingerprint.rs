/// Stable, cheap content fingerprint used by the dedup ledger.
///
/// Polynomial rolling hash folded into a signed 32-bit integer and rendered
/// as its decimal string. Collision-tolerant by design; this is a dedup key,
/// not a cryptographic digest.
pub fn fingerprint(payload: &str) -> String {
    let mut hash: i32 = 0;
    for unit in payload.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    hash.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_equal_payloads() {
        let a = fingerprint("sephora serum restock alert");
        let b = fingerprint("sephora serum restock alert");
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_nearby_payloads() {
        assert_ne!(fingerprint("retinol 0.5%"), fingerprint("retinol 1.0%"));
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }

    #[test]
    fn empty_payload_hashes_to_zero() {
        assert_eq!(fingerprint(""), "0");
    }
}
