//! Shared proptest generators.

use proptest::prelude::*;

/// Dotted-quad IPv4 addresses with their expected node id.
pub fn ipv4_with_node_strategy() -> impl Strategy<Value = (String, u16)> {
    any::<[u8; 4]>().prop_map(|[a, b, c, d]| (format!("{a}.{b}.{c}.{d}"), u16::from_be_bytes([c, d])))
}

/// Strings that are not valid IP addresses.
pub fn malformed_ip_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,12}",
        "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        "(25[6-9]|2[6-9][0-9])\\.[0-9]\\.[0-9]\\.[0-9]",
    ]
}

/// Arbitrary message payloads, including empty and non-UTF-8 ones.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..1024)
}

/// Upstream user ids.
pub fn user_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,24}"
}

/// Work item ids.
pub fn work_id_strategy() -> impl Strategy<Value = String> {
    "tx-[0-9a-f]{8}"
}
