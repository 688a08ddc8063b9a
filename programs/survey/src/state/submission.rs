use anchor_lang::prelude::*;

use crate::error::ErrorCode;

/// A participant's write-once survey record.
///
/// The PDA address (seeded by the participant) is the storage scope the
/// ciphertext is bound to. `present` flips to true exactly once and the
/// record is never written afterwards.
#[account]
#[derive(InitSpace)]
pub struct SubmissionAccount {
    /// PDA bump seed
    pub bump: u8,
    /// The encoded answer, encrypted to the MXE as a 32-byte ciphertext.
    /// Must stay directly after `bump`, MPC reads it by offset.
    pub answer_state: [u8; 32],
    /// Nonce for `answer_state`
    pub nonce: u128,
    /// The participant this record belongs to
    pub identity: Pubkey,
    /// Set once the answer passed validation
    pub present: bool,
    /// Set while a submission is being validated
    pub pending: bool,
}

/// Split an address into the two little-endian u128 halves MPC compares.
pub fn address_halves(key: &Pubkey) -> [u128; 2] {
    let bytes = key.to_bytes();
    let mut lo = [0u8; 16];
    let mut hi = [0u8; 16];
    lo.copy_from_slice(&bytes[..16]);
    hi.copy_from_slice(&bytes[16..]);
    [u128::from_le_bytes(lo), u128::from_le_bytes(hi)]
}

impl SubmissionAccount {
    /// Settle a pending submission with the validation outcome.
    ///
    /// `stored` is the MXE ciphertext and nonce of an answer that passed
    /// validation, or `None` when it failed or the computation could not be
    /// verified. Either way the record stops being pending; only a passed
    /// answer makes it present. Returns whether the answer was stored.
    pub fn settle(&mut self, stored: Option<([u8; 32], u128)>) -> Result<bool> {
        require!(!self.present, ErrorCode::DuplicateSubmission);
        self.pending = false;

        match stored {
            Some((answer_state, nonce)) => {
                self.answer_state = answer_state;
                self.nonce = nonce;
                self.present = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Ciphertext or the all-zero sentinel when nothing was stored.
    pub fn ciphertext(&self) -> [u8; 32] {
        if self.present {
            self.answer_state
        } else {
            [0; 32]
        }
    }

    /// Read a record from a possibly uninitialized account.
    pub fn load(account: &AccountInfo) -> Result<Option<Self>> {
        if account.data_is_empty() {
            return Ok(None);
        }
        let data = account.try_borrow_data()?;
        let record = Self::try_deserialize(&mut &data[..])?;
        Ok(Some(record))
    }
}
