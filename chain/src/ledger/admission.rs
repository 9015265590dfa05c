//! Transaction and data admission into the pending pools.
//!
//! Every non-system transaction must carry a signature that verifies
//! against the canonical hash of `(sender, recipient, value)` with the
//! supplied public key, the key must derive to the sender address, and the
//! sender's confirmed balance must cover the value. System-sender credits
//! (mining rewards, joining fees) bypass all three checks.
//!
//! The `try_*` functions return a typed [`AdmissionError`] for logging; the
//! plain variants collapse it into the `bool` exposed to callers.

use thiserror::Error;

use crate::crypto::{PublicKey, Signature};
use crate::params::{JOINING_FEE, REWARD_SHARE_PERCENT};
use crate::types::{Address, Amount, Balance, Transaction, UserData};

use super::blockchain::Blockchain;
use super::request::TransactionRequest;

#[derive(Debug, Error, PartialEq)]
pub enum AdmissionError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("insufficient balance: have {balance} minor units, need {required}")]
    InsufficientBalance { balance: Balance, required: Amount },

    #[error("signature does not match the transaction")]
    SignatureMismatch,

    #[error("public key derives {derived}, not the declared sender {declared}")]
    AddressMismatch { declared: Address, derived: Address },
}

impl Blockchain {
    /// Admits a single transfer; see [`Blockchain::try_add_transaction`].
    pub fn add_transaction(
        &mut self,
        sender: Address,
        recipient: Address,
        value: Amount,
        public_key: Option<&PublicKey>,
        signature: Option<&Signature>,
    ) -> bool {
        match self.try_add_transaction(sender, recipient, value, public_key, signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "transaction rejected");
                false
            }
        }
    }

    /// Validates a transfer and appends it to the transaction pool.
    ///
    /// On rejection the pool is left unchanged.
    pub fn try_add_transaction(
        &mut self,
        sender: Address,
        recipient: Address,
        value: Amount,
        public_key: Option<&PublicKey>,
        signature: Option<&Signature>,
    ) -> Result<(), AdmissionError> {
        let tx = Transaction::new(sender, recipient, value);
        self.authorize(&tx, public_key, signature)?;

        tracing::debug!(
            sender = %tx.sender,
            recipient = %tx.recipient,
            value = %tx.value,
            "transaction admitted"
        );
        self.push_pending_transaction(tx);
        self.persist();
        Ok(())
    }

    /// Admits a wire request; see [`Blockchain::try_submit`].
    pub fn submit(&mut self, request: &TransactionRequest) -> bool {
        match self.try_submit(request) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "transaction request rejected");
                false
            }
        }
    }

    /// Parses, authorises and admits a signed request.
    ///
    /// With `share` set, [`REWARD_SHARE_PERCENT`] of the value is withheld
    /// from the direct transfer and split evenly into transfers from the
    /// sender to every distinct confirmed data contributor other than the
    /// sender. The single signature over the full value authorises all
    /// parts, and all parts are admitted together or not at all.
    ///
    /// Returns the admitted transactions.
    pub fn try_submit(
        &mut self,
        request: &TransactionRequest,
    ) -> Result<Vec<Transaction>, AdmissionError> {
        let parsed = request.parse()?;
        self.authorize(
            &parsed.transaction,
            Some(&parsed.public_key),
            Some(&parsed.signature),
        )?;

        let parts = if parsed.share {
            self.split_for_contributors(parsed.transaction)
        } else {
            vec![parsed.transaction]
        };

        tracing::debug!(parts = parts.len(), share = parsed.share, "transaction request admitted");
        self.push_pending_transactions(parts.iter().cloned());
        self.persist();
        Ok(parts)
    }

    /// Credits the one-time joining fee to `address`.
    ///
    /// Returns `false` if the credit is already confirmed or pending, or the
    /// address is empty.
    pub fn deposit_joining_fee(&mut self, address: &Address) -> bool {
        if address.is_empty() || address.is_system() {
            return false;
        }
        let credit = Transaction::system_credit(address.clone(), JOINING_FEE);
        if self.has_confirmed(&credit) || self.has_pending(&credit) {
            tracing::debug!(%address, "joining fee already granted");
            return false;
        }
        tracing::info!(%address, fee = %JOINING_FEE, "joining fee credited");
        self.push_pending_transaction(credit);
        self.persist();
        true
    }

    /// Admits a data record; see [`Blockchain::try_add_data`].
    pub fn add_data(&mut self, entry: UserData) -> bool {
        match self.try_add_data(entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "data record rejected");
                false
            }
        }
    }

    /// Appends a data record to the data pool.
    ///
    /// Only the shape is checked: the owner address must be non-empty.
    pub fn try_add_data(&mut self, entry: UserData) -> Result<(), AdmissionError> {
        if entry.owner.is_empty() {
            return Err(AdmissionError::Validation(
                "blockchainAddress is required".into(),
            ));
        }
        self.push_pending_data(entry);
        self.persist();
        Ok(())
    }

    fn authorize(
        &self,
        tx: &Transaction,
        public_key: Option<&PublicKey>,
        signature: Option<&Signature>,
    ) -> Result<(), AdmissionError> {
        if tx.is_system() {
            return Ok(());
        }
        if tx.sender.is_empty() || tx.recipient.is_empty() {
            return Err(AdmissionError::Validation(
                "sender and recipient are required".into(),
            ));
        }
        if tx.value.is_zero() {
            return Err(AdmissionError::Validation("value must be positive".into()));
        }
        let (Some(public_key), Some(signature)) = (public_key, signature) else {
            return Err(AdmissionError::Validation(
                "public key and signature are required".into(),
            ));
        };

        if public_key.verify_transaction(tx, signature).is_err() {
            return Err(AdmissionError::SignatureMismatch);
        }

        let derived = public_key.address();
        if derived != tx.sender {
            return Err(AdmissionError::AddressMismatch {
                declared: tx.sender.clone(),
                derived,
            });
        }

        let balance = self.balance_of(&tx.sender);
        if balance < tx.value.as_balance() {
            return Err(AdmissionError::InsufficientBalance {
                balance,
                required: tx.value,
            });
        }
        Ok(())
    }

    fn split_for_contributors(&self, tx: Transaction) -> Vec<Transaction> {
        let contributors = self.data_contributors(&tx.sender);
        let withheld = tx.value.percent(REWARD_SHARE_PERCENT);
        let (share, _) = withheld.split_evenly(contributors.len());
        if share.is_zero() {
            return vec![tx];
        }

        let distributed = share.minor_units() * contributors.len() as u64;
        let direct = Amount(tx.value.minor_units() - distributed);

        let mut parts = Vec::with_capacity(contributors.len() + 1);
        parts.push(Transaction::new(tx.sender.clone(), tx.recipient, direct));
        parts.extend(
            contributors
                .into_iter()
                .map(|c| Transaction::new(tx.sender.clone(), c, share)),
        );
        parts
    }
}
