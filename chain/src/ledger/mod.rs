//! Ledger store and admission.
//!
//! - [`blockchain::Blockchain`]: confirmed chain plus pending pools,
//! - [`admission`]: signature, ownership and balance checks for new entries,
//! - [`snapshot::ChainSnapshot`]: the full-state wire and storage record,
//! - [`request::TransactionRequest`]: the signed transfer request format.

pub mod admission;
pub mod blockchain;
pub mod request;
pub mod snapshot;

pub use admission::AdmissionError;
pub use blockchain::Blockchain;
pub use request::{ParsedRequest, TransactionRequest};
pub use snapshot::ChainSnapshot;
