//! Identifier helpers
use bech32::Bech32m;
use uuid7::uuid7;

/// Length of a hex-encoded uuid7
pub const UUID_HEX_LEN: usize = 32;

// construct a unique id then encode using bech32m under the given prefix
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_uuid_hex() -> String {
    hex::encode(uuid7().as_bytes())
}

/// True when `value` is exactly the lowercase hex form of a 16 byte id
pub fn is_uuid_hex(value: &str) -> bool {
    value.len() == UUID_HEX_LEN
        && !value.bytes().any(|b| b.is_ascii_uppercase())
        && hex::decode(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bech32_ids_carry_prefix() {
        let id = new_uuid_to_bech32("ref").unwrap();
        assert!(id.starts_with("ref1"));
        assert_ne!(id, new_uuid_to_bech32("ref").unwrap());
    }

    #[test]
    fn empty_prefix_is_rejected() {
        assert!(new_uuid_to_bech32("").is_err());
    }

    #[test]
    fn hex_ids_round_trip_through_validation() {
        let id = new_uuid_hex();
        assert_eq!(id.len(), UUID_HEX_LEN);
        assert!(is_uuid_hex(&id));
        assert!(!is_uuid_hex(&id.to_uppercase()));
        assert!(!is_uuid_hex("not-an-id"));
        assert!(!is_uuid_hex(&id[..30]));
        assert!(!is_uuid_hex(&format!("{}zz", &id[..30])));
    }
}
