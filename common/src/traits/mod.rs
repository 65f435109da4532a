pub mod cdc_client;
pub mod chain_client;
pub mod notifier;
pub mod store;

pub use cdc_client::CdcClient;
pub use chain_client::{CallRequest, ChainClient};
pub use notifier::Notifier;
pub use store::IndexedStore;
