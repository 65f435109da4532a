//! Scriptable doubles for exercising the ingestion/alert/CDC pipeline
//! end to end without a live chain, notifier or downstream database.

pub mod mock_cdc;
pub mod mock_chain;
pub mod mock_notifier;

pub use mock_cdc::MockCdcClient;
pub use mock_chain::MockChainClient;
pub use mock_notifier::MockNotifier;
