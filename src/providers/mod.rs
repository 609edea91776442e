//! Providers Module - Wallet Data Sources
//!
//! Produces `WalletRecord`s. Live data comes from the Etherscan V2 API,
//! recorded dumps from `StaticWalletSource`.

pub mod etherscan;
pub mod pacer;
pub mod static_source;

use futures_util::future::BoxFuture;

use crate::models::errors::AppResult;
use crate::models::types::WalletRecord;

pub use etherscan::EtherscanClient;
pub use pacer::RequestPacer;
pub use static_source::StaticWalletSource;

/// Anything that can produce a full snapshot of one wallet.
///
/// `address` is already normalized to lowercase. Failures here abort the
/// analysis of that wallet; they never yield a partial record.
pub trait WalletSource: Send + Sync {
    fn fetch_wallet<'a>(&'a self, address: &'a str) -> BoxFuture<'a, AppResult<WalletRecord>>;

    fn name(&self) -> &'static str;
}
