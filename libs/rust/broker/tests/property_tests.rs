//! Property-based tests for relay-broker crate.

use proptest::prelude::*;
use relay_broker::{BrokerClient, BrokerConfig, BrokerDriver, InMemoryDriver};
use std::sync::Arc;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any non-empty host with a non-zero port is a valid bootstrap entry.
    #[test]
    fn prop_host_port_accepted(host in "[a-z][a-z0-9.-]{0,30}", port in 1u16..) {
        let config = BrokerConfig::new(&format!("{host}:{port}"));
        prop_assert!(config.validate().is_ok());
    }

    /// An entry without a port separator is always rejected.
    #[test]
    fn prop_missing_port_rejected(host in "[a-z][a-z0-9.-]{0,30}") {
        prop_assert!(BrokerConfig::new(&host).validate().is_err());
    }

    /// Payload bytes reach the consumer side exactly as they were sent.
    #[test]
    fn prop_payload_sent_verbatim(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let driver = Arc::new(InMemoryDriver::new().with_poll_timeout(Duration::from_millis(5)));
            let client = BrokerClient::with_driver(Arc::clone(&driver) as Arc<dyn BrokerDriver>);
            driver.subscribe("t").unwrap();

            client.producer("t").send_message(&payload).await.unwrap();
            let fetches = driver.poll_fetches().await;

            prop_assert_eq!(fetches.records.len(), 1);
            prop_assert_eq!(&fetches.records[0].payload, &payload);
            Ok(())
        })?;
    }
}
