pub mod wallet;

pub use wallet::{CallerIdentity, WALLET_HEADER, extract_wallet_address, require_wallet};
