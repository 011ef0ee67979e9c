//! Default paying and signing identity

use std::fmt;
use std::sync::Arc;

use meridian_crypto::{PublicKey, Signer};
use meridian_primitives::AccountId;

/// Account that pays for operations by default, with the signer authorizing it.
///
/// Replaced as a whole on the client; never mutated in place.
#[derive(Clone)]
pub struct Operator {
    account_id: AccountId,
    signer: Arc<dyn Signer>,
}

impl Operator {
    /// Operator paying from `account_id`, signing through `signer`
    pub fn new(account_id: AccountId, signer: Arc<dyn Signer>) -> Self {
        Self { account_id, signer }
    }

    /// Paying account
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Key the operator signs with
    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// Signer capability
    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key())
            .finish()
    }
}
