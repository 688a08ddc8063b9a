use anchor_lang::prelude::*;

#[event]
pub struct SubmissionEvent {
    pub identity: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct SubmissionRejectedEvent {
    pub identity: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct AnswerDecryptedEvent {
    pub identity: Pubkey,
    /// The answer re-encrypted to the requester's x25519 key
    pub ciphertext: [u8; 32],
    pub nonce: [u8; 16],
}
