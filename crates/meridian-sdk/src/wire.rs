//! Wire envelope codec
//!
//! Everything a node sees is RLP: a signed body per node, the envelope carrying
//! that body with its signatures, the query request wrapper and the common
//! response shape. Operation payloads travel as opaque bytes inside these.
//!
//! Layouts:
//!
//! - body: `[kind, transactionId, nodeAccountId, fee, validDurationSecs, memo, data]`
//! - envelope: `[bodyBytes, [[publicKey, signature], ...]]`
//! - query request: `[[responseType, paymentEnvelope], body]`
//! - response: `[status, cost, payload]`
//!
//! Signed amounts are written as the two's-complement `u64` of their tiny value.

use bytes::Bytes;
use meridian_crypto::PublicKey;
use meridian_primitives::{AccountId, Amount, Status, TransactionId};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use crate::transaction::TransactionKind;
use crate::{Error, Result};

pub(crate) fn append_amount(s: &mut RlpStream, amount: Amount) {
    s.append(&(amount.to_tiny() as u64));
}

pub(crate) fn amount_at(rlp: &Rlp, index: usize) -> std::result::Result<Amount, DecoderError> {
    Ok(Amount::from_tiny(rlp.val_at::<u64>(index)? as i64))
}

/// Optional values are a list of zero or one item
pub(crate) fn append_optional<E: Encodable>(s: &mut RlpStream, value: Option<&E>) {
    match value {
        Some(value) => {
            s.begin_list(1);
            s.append(value);
        }
        None => {
            s.begin_list(0);
        }
    }
}

pub(crate) fn optional_at<T: Decodable>(
    rlp: &Rlp,
    index: usize,
) -> std::result::Result<Option<T>, DecoderError> {
    let item = rlp.at(index)?;
    match item.item_count()? {
        0 => Ok(None),
        1 => Ok(Some(item.val_at(0)?)),
        _ => Err(DecoderError::RlpIncorrectListLen),
    }
}

pub(crate) fn expect_items(rlp: &Rlp, count: usize) -> std::result::Result<(), DecoderError> {
    if rlp.item_count()? != count {
        return Err(DecoderError::RlpIncorrectListLen);
    }
    Ok(())
}

/// `[[account, amount], ...]`
pub(crate) fn append_transfers(s: &mut RlpStream, transfers: &[(AccountId, Amount)]) {
    s.begin_list(transfers.len());
    for (account, amount) in transfers {
        s.begin_list(2);
        s.append(account);
        append_amount(s, *amount);
    }
}

pub(crate) fn transfers_at(
    rlp: &Rlp,
    index: usize,
) -> std::result::Result<Vec<(AccountId, Amount)>, DecoderError> {
    rlp.at(index)?
        .iter()
        .map(|pair| -> std::result::Result<_, DecoderError> {
            expect_items(&pair, 2)?;
            Ok((pair.val_at(0)?, amount_at(&pair, 1)?))
        })
        .collect()
}

// ==================== Transaction body ====================

/// The bytes each signature covers. One per target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    /// Operation kind
    pub kind: TransactionKind,
    /// Transaction id
    pub transaction_id: TransactionId,
    /// Node the body is addressed to
    pub node_account_id: AccountId,
    /// Most the payer will pay in fees
    pub max_transaction_fee: Amount,
    /// Validity window length in seconds
    pub valid_duration_secs: u64,
    /// Free-form memo
    pub memo: String,
    /// Kind-specific payload
    pub data: Vec<u8>,
}

impl TransactionBody {
    /// Encode to RLP
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for TransactionBody {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(7);
        s.append(&self.kind.code());
        s.append(&self.transaction_id);
        s.append(&self.node_account_id);
        append_amount(s, self.max_transaction_fee);
        s.append(&self.valid_duration_secs);
        s.append(&self.memo);
        s.append(&self.data);
    }
}

impl Decodable for TransactionBody {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 7)?;
        let kind = TransactionKind::from_code(rlp.val_at(0)?)
            .ok_or(DecoderError::Custom("unknown transaction kind"))?;
        Ok(Self {
            kind,
            transaction_id: rlp.val_at(1)?,
            node_account_id: rlp.val_at(2)?,
            max_transaction_fee: amount_at(rlp, 3)?,
            valid_duration_secs: rlp.val_at(4)?,
            memo: rlp.val_at(5)?,
            data: rlp.val_at(6)?,
        })
    }
}

// ==================== Signed envelope ====================

/// One signature over a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePair {
    /// Key the signature verifies against
    pub public_key: PublicKey,
    /// Ed25519 signature
    pub signature: Vec<u8>,
}

impl Encodable for SignaturePair {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.public_key.to_bytes().to_vec());
        s.append(&self.signature);
    }
}

impl Decodable for SignaturePair {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 2)?;
        let key: Vec<u8> = rlp.val_at(0)?;
        let public_key = PublicKey::from_bytes(&key)
            .map_err(|_| DecoderError::Custom("invalid public key"))?;
        Ok(Self {
            public_key,
            signature: rlp.val_at(1)?,
        })
    }
}

/// Body bytes plus the signatures over them, as sent to one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Encoded [`TransactionBody`]
    pub body_bytes: Vec<u8>,
    /// Signatures over `body_bytes`
    pub signatures: Vec<SignaturePair>,
}

impl SignedTransaction {
    /// Encode to RLP
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rlp::decode(bytes)?)
    }

    /// Decode the carried body
    pub fn body(&self) -> Result<TransactionBody> {
        TransactionBody::from_bytes(&self.body_bytes)
    }

    /// Check every signature against the body
    pub fn verify(&self) -> Result<()> {
        for pair in &self.signatures {
            pair.public_key.verify(&self.body_bytes, &pair.signature)?;
        }
        Ok(())
    }
}

impl Encodable for SignedTransaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.body_bytes);
        s.begin_list(self.signatures.len());
        for pair in &self.signatures {
            s.append(pair);
        }
    }
}

impl Decodable for SignedTransaction {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 2)?;
        Ok(Self {
            body_bytes: rlp.val_at(0)?,
            signatures: rlp.list_at(1)?,
        })
    }
}

/// Encode a list of envelopes (one per node) for storage or hand-off
pub fn encode_transaction_list(envelopes: &[SignedTransaction]) -> Vec<u8> {
    let mut s = RlpStream::new_list(envelopes.len());
    for envelope in envelopes {
        s.append(envelope);
    }
    s.out().to_vec()
}

/// Decode a list written by [`encode_transaction_list`]
pub fn decode_transaction_list(bytes: &[u8]) -> Result<Vec<SignedTransaction>> {
    Ok(Rlp::new(bytes).as_list()?)
}

// ==================== Queries ====================

/// What a query asks the node for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// The answer itself
    Answer,
    /// Only the price of the answer
    CostOnly,
}

impl ResponseType {
    fn code(self) -> u8 {
        match self {
            ResponseType::Answer => 0,
            ResponseType::CostOnly => 1,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ResponseType::Answer),
            1 => Some(ResponseType::CostOnly),
            _ => None,
        }
    }
}

/// Query sent to one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Answer or cost only
    pub response_type: ResponseType,
    /// Payment envelope for paid queries
    pub payment: Option<SignedTransaction>,
    /// Kind-specific query body
    pub body: Vec<u8>,
}

impl QueryRequest {
    /// Encode to RLP
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for QueryRequest {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.begin_list(2);
        s.append(&self.response_type.code());
        // an absent payment is an empty byte string
        let payment = self
            .payment
            .as_ref()
            .map(SignedTransaction::to_bytes)
            .unwrap_or_default();
        s.append(&payment);
        s.append(&self.body);
    }
}

impl Decodable for QueryRequest {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 2)?;
        let header = rlp.at(0)?;
        expect_items(&header, 2)?;
        let response_type = ResponseType::from_code(header.val_at(0)?)
            .ok_or(DecoderError::Custom("unknown response type"))?;
        let payment: Vec<u8> = header.val_at(1)?;
        let payment = if payment.is_empty() {
            None
        } else {
            Some(rlp::decode(&payment)?)
        };
        Ok(Self {
            response_type,
            payment,
            body: rlp.val_at(1)?,
        })
    }
}

// ==================== Responses ====================

/// What a node answers to any request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Precheck status
    pub status: Status,
    /// Price of the query answer; zero for transactions
    pub cost: Amount,
    /// Kind-specific answer
    pub payload: Bytes,
}

impl Response {
    /// Response with a status and nothing else
    pub fn new(status: Status) -> Self {
        Self {
            status,
            cost: Amount::ZERO,
            payload: Bytes::new(),
        }
    }

    /// Response carrying an answer
    pub fn with_payload(status: Status, payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::new(status)
        }
    }

    /// Response to a cost query
    pub fn with_cost(status: Status, cost: Amount) -> Self {
        Self {
            cost,
            ..Self::new(status)
        }
    }

    /// Encode to RLP
    pub fn to_bytes(&self) -> Bytes {
        rlp::encode(self).freeze()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rlp::decode(bytes).map_err(|e| Error::Codec(format!("malformed response: {e}")))
    }
}

impl Encodable for Response {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.status);
        append_amount(s, self.cost);
        s.append(&self.payload.to_vec());
    }
}

impl Decodable for Response {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 3)?;
        let payload: Vec<u8> = rlp.val_at(2)?;
        Ok(Self {
            status: rlp.val_at(0)?,
            cost: amount_at(rlp, 1)?,
            payload: Bytes::from(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::PrivateKey;
    use meridian_primitives::Timestamp;

    fn body() -> TransactionBody {
        TransactionBody {
            kind: TransactionKind::Transfer,
            transaction_id: TransactionId::new(AccountId::from_num(1001), Timestamp::new(100, 7)),
            node_account_id: AccountId::from_num(3),
            max_transaction_fee: Amount::from_coins(2),
            valid_duration_secs: 120,
            memo: "hello".into(),
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_body_roundtrip() {
        let body = body();
        assert_eq!(TransactionBody::from_bytes(&body.to_bytes()).unwrap(), body);
    }

    #[test]
    fn test_envelope_signatures_verify() {
        let key = PrivateKey::generate();
        let body_bytes = body().to_bytes();
        let signed = SignedTransaction {
            signatures: vec![SignaturePair {
                public_key: key.public_key(),
                signature: key.sign(&body_bytes),
            }],
            body_bytes,
        };
        let decoded = SignedTransaction::from_bytes(&signed.to_bytes()).unwrap();
        assert_eq!(decoded, signed);
        decoded.verify().unwrap();

        let mut tampered = decoded.clone();
        tampered.body_bytes.push(0);
        assert!(tampered.verify().is_err());
    }

    #[test]
    fn test_query_request_without_payment() {
        let request = QueryRequest {
            response_type: ResponseType::CostOnly,
            payment: None,
            body: vec![9],
        };
        assert_eq!(QueryRequest::from_bytes(&request.to_bytes()).unwrap(), request);
    }

    #[test]
    fn test_negative_amount_survives() {
        let response = Response::with_cost(Status::Ok, Amount::from_tiny(-5));
        let decoded = Response::from_bytes(&response.to_bytes()).unwrap();
        assert_eq!(decoded.cost, Amount::from_tiny(-5));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut s = RlpStream::new_list(7);
        s.append(&250u8);
        s.append(&TransactionId::new(AccountId::from_num(2), Timestamp::new(1, 0)));
        s.append(&AccountId::from_num(3));
        s.append(&0u64);
        s.append(&120u64);
        s.append(&String::new());
        s.append(&Vec::<u8>::new());
        assert!(matches!(
            TransactionBody::from_bytes(&s.out()),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_garbage_response_is_codec_error() {
        assert!(matches!(Response::from_bytes(&[0xff, 0x00]), Err(Error::Codec(_))));
    }

    #[test]
    fn test_response_keeps_all_fields() {
        let cost = Response::with_cost(Status::Ok, Amount::from_tiny(5));
        let bytes = cost.to_bytes();
        assert_eq!(&bytes[..], &[0xc3, 0x80, 0x05, 0x80]);
        assert_eq!(Response::from_bytes(&bytes).unwrap(), cost);

        let answer = Response::with_payload(Status::Busy, vec![9, 9]);
        assert_eq!(Response::from_bytes(&answer.to_bytes()).unwrap(), answer);
    }
}
