//! # meridian-sdk
//!
//! Client SDK for Meridian ledgers.
//!
//! ## Features
//!
//! - **Client**: node registry, operator and execution policy
//! - **Transactions**: transfers, account, file and token operations with a
//!   `Building -> Frozen -> Executing -> Resolved` lifecycle
//! - **Queries**: balances, account records, receipts and records, with cost
//!   lookup and payment
//! - **Execution engine**: node rotation, per-node backoff, retryable statuses
//!   and transaction id regeneration on expiry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian_sdk::{AccountId, Amount, Client, PrivateKey, TransferTransaction};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::for_testnet()?;
//!     client.set_operator(AccountId::from_num(1001), PrivateKey::generate())?;
//!
//!     let mut transfer = TransferTransaction::new();
//!     transfer
//!         .add_transfer(AccountId::from_num(1001), Amount::from_coins(-1))?
//!         .add_transfer(AccountId::from_num(1002), Amount::from_coins(1))?;
//!
//!     let response = transfer.execute(&client).await?;
//!     let receipt = response.get_receipt(&client).await?;
//!     println!("status: {}", receipt.status);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod config;
mod error;
mod execute;
mod operator;
pub mod query;
mod receipt;
mod response;
pub mod transaction;
pub mod wire;

pub use client::{
    Client, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_QUERY_PAYMENT,
    DEFAULT_MIN_BACKOFF,
};
pub use config::{ClientConfig, MirrorNetworkConfig, NetworkConfig, OperatorConfig};
pub use error::{Error, Result};
pub use operator::Operator;
pub use query::{
    AccountBalance, AccountBalanceQuery, AccountRecordsQuery, Query, QueryData,
    TransactionReceiptQuery, TransactionRecordQuery,
};
pub use receipt::{TransactionReceipt, TransactionRecord};
pub use response::TransactionResponse;
pub use transaction::{
    AccountCreateTransaction, AccountDeleteTransaction, AnyTransaction, AnyTransactionData,
    FileAppendTransaction, FileUpdateTransaction, LifecycleState, TokenUnfreezeTransaction,
    Transaction, TransactionData, TransactionKind, TransferTransaction,
};

pub use meridian_crypto::{FnSigner, PrivateKey, PublicKey, Signer};
pub use meridian_network::{Channel, ChannelFactory, MockChannel, MockRequest, TransportError};
pub use meridian_primitives::{
    AccountId, Amount, EntityId, FileId, LedgerId, Status, Timestamp, TokenId, TransactionId,
};
