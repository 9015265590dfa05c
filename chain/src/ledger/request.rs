use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, Signature};
use crate::types::{Address, Amount, Transaction};

use super::admission::AdmissionError;

/// Signed transfer request as submitted by wallets and forwarded by peers.
///
/// All fields are optional on the wire so a malformed request decodes and
/// is then rejected by [`TransactionRequest::parse`] with a validation
/// error, rather than failing at the JSON layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub sender_public_key: Option<String>,
    pub sender_chain_address: Option<String>,
    pub signature: Option<String>,
    #[serde(alias = "recepientChainAddress")]
    pub recipient_chain_address: Option<String>,
    pub value: Option<Amount>,
    /// Withhold a share of the value for confirmed data contributors.
    #[serde(default)]
    pub share: bool,
}

/// A request whose fields are present and decodable.
#[derive(Clone, Debug)]
pub struct ParsedRequest {
    pub transaction: Transaction,
    pub public_key: PublicKey,
    pub signature: Signature,
    pub share: bool,
}

impl TransactionRequest {
    pub fn parse(&self) -> Result<ParsedRequest, AdmissionError> {
        let sender = required(&self.sender_chain_address, "senderChainAddress")?;
        if Address::from(sender).is_system() {
            return Err(AdmissionError::Validation(
                "senderChainAddress is reserved".into(),
            ));
        }
        let recipient = required(&self.recipient_chain_address, "recipientChainAddress")?;
        let pk_hex = required(&self.sender_public_key, "senderPublicKey")?;
        let sig_hex = required(&self.signature, "signature")?;

        let value = self
            .value
            .filter(|v| !v.is_zero())
            .ok_or_else(|| AdmissionError::Validation("value must be positive".into()))?;

        let public_key = PublicKey::from_hex(pk_hex)
            .map_err(|e| AdmissionError::Validation(format!("senderPublicKey: {e}")))?;
        let signature = Signature::from_hex(sig_hex)
            .map_err(|e| AdmissionError::Validation(format!("signature: {e}")))?;

        Ok(ParsedRequest {
            transaction: Transaction::new(Address::from(sender), Address::from(recipient), value),
            public_key,
            signature,
            share: self.share,
        })
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, AdmissionError> {
    match field.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(AdmissionError::Validation(format!("{name} is required"))),
    }
}
