//! Private prover input. Held only by the sender's wallet.

use std::fmt;

use umbra_crypto::{ElGamal, Point, Scalar};

use crate::statement::TransferStatement;

#[derive(Clone, PartialEq, Eq)]
pub struct Witness {
    pub secret_key: Scalar,
    pub blinding: Scalar,
    pub amount: u64,
    pub remaining_balance: u64,
    pub sender_index: usize,
    pub receiver_index: usize,
}

impl Witness {
    /// Cheap relation checks a prover runs before spending time on a proof:
    /// both indices sit inside the ring, they differ, the ring carries the
    /// sender's public key, and the sender's new ciphertext decrypts to the
    /// remaining balance.
    pub fn is_consistent_with(&self, statement: &TransferStatement) -> bool {
        let ring = statement.ring_size;
        if self.sender_index >= ring || self.receiver_index >= ring {
            return false;
        }
        if self.sender_index == self.receiver_index {
            return false;
        }
        let (Some(pk), Some(left), Some(right)) = (
            statement.public_key_list.get(self.sender_index),
            statement.c_ln.get(self.sender_index),
            statement.c_rn.get(self.sender_index),
        ) else {
            return false;
        };
        if Point::mul_generator(&self.secret_key) != *pk {
            return false;
        }
        let balance = ElGamal::new(*left, *right).decrypt_point(&self.secret_key);
        balance == Point::mul_generator(&Scalar::from_u64(self.remaining_balance))
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("secret_key", &"<redacted>")
            .field("blinding", &"<redacted>")
            .field("amount", &"<redacted>")
            .field("remaining_balance", &"<redacted>")
            .field("sender_index", &"<redacted>")
            .field("receiver_index", &"<redacted>")
            .finish()
    }
}
