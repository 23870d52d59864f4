//! Property tests for endpoint resolution.
//!
//! Resolution is a pure function: these tests pin down determinism, the
//! explicit-host precedence rule, and the shape of every produced
//! configuration, across arbitrary syntactically valid addresses.

#![allow(clippy::unwrap_used)]

use mailprobe_connect::provider::resolve;
use proptest::prelude::*;

/// Local parts and domain labels that keep the address syntactically valid.
fn address_strategy() -> impl Strategy<Value = String> {
    (
        "[a-z][a-z0-9.]{0,15}",
        "[a-z][a-z0-9-]{0,12}",
        "[a-z]{2,6}",
    )
        .prop_map(|(local, label, tld)| format!("{local}@{label}.{tld}"))
}

proptest! {
    #[test]
    fn resolution_is_deterministic(address in address_strategy()) {
        let first = resolve(&address, None, None, None).unwrap();
        let second = resolve(&address, None, None, None).unwrap();

        prop_assert_eq!(&first.config.host, &second.config.host);
        prop_assert_eq!(first.config.port, second.config.port);
        prop_assert_eq!(first.provider_key, second.provider_key);
    }

    #[test]
    fn resolved_config_is_always_complete(address in address_strategy()) {
        let res = resolve(&address, None, None, None).unwrap();

        prop_assert!(!res.config.host.is_empty());
        prop_assert!(res.config.port >= 1);
        prop_assert!(!res.provider_name.is_empty());
    }

    #[test]
    fn explicit_host_always_wins(
        address in address_strategy(),
        host in "[a-z][a-z0-9-]{0,12}\\.example",
        port in 1u16..,
    ) {
        let res = resolve(&address, None, Some(&host), Some(port)).unwrap();

        prop_assert_eq!(res.config.host, host);
        prop_assert_eq!(res.config.port, port);
        prop_assert_eq!(res.provider_key, "custom");
    }

    #[test]
    fn unmatched_domains_use_imap_subdomain(
        local in "[a-z]{1,8}",
        label in "zz[bcdfghjklmnpqrstvwz]{6,10}",
    ) {
        // Vowel-free labels under .test cannot contain any registered
        // provider pattern.
        let domain = format!("{label}.test");
        let address = format!("{local}@{domain}");
        let res = resolve(&address, None, None, None).unwrap();

        prop_assert_eq!(res.provider_key, "generic");
        prop_assert_eq!(res.config.host, format!("imap.{domain}"));
        prop_assert_eq!(res.config.port, 993);
    }
}
