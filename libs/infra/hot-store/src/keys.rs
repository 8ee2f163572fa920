// [libs/infra/hot-store/src/keys.rs]
//! Canonical hot-store key layout.
//!
//! Every caller builds keys through these functions rather than formatting
//! them inline, so a bootstrap path can never drift onto a truncated prefix
//! like `":balance:{id}"` instead of `"customer:balance:{id}"` -- see
//! `hot_store::tests::canonical_balance_key_has_full_prefix`.

pub fn balance_key(customer_id: &str) -> String {
    format!("customer:balance:{customer_id}")
}

pub fn reserved_key(customer_id: &str) -> String {
    format!("customer:reserved:{customer_id}")
}

pub fn request_key(request_id: &str) -> String {
    format!("request:{request_id}")
}

pub fn apikey_key(sha256_hex: &str) -> String {
    format!("apikey:{sha256_hex}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_balance_key_has_full_prefix() {
        assert_eq!(balance_key("cust_1"), "customer:balance:cust_1");
        assert!(!balance_key("cust_1").starts_with(":balance:"));
    }

    #[test]
    fn canonical_reserved_key_has_full_prefix() {
        assert_eq!(reserved_key("cust_1"), "customer:reserved:cust_1");
    }
}
