use anchor_lang::prelude::*;

use crate::{error::ErrorCode, state::SubmissionAccount, survey::SubmissionQuery};

fn load_record(ctx: &Context<SubmissionQuery>) -> Result<Option<SubmissionAccount>> {
    let account = ctx.accounts.submission_account.to_account_info();
    if !account.data_is_empty() {
        require_keys_eq!(*account.owner, crate::ID, ErrorCode::ScopeMismatch);
    }
    SubmissionAccount::load(&account)
}

/// Whether `identity` has a validated submission.
///
/// `identity` is only read by the `SubmissionQuery` seeds constraint, which the
/// compiler cannot see after Anchor's macro expansion.
#[allow(unused_variables)]
pub fn has_submitted(ctx: Context<SubmissionQuery>, identity: Pubkey) -> Result<bool> {
    Ok(load_record(&ctx)?.map(|r| r.present).unwrap_or(false))
}

/// The stored ciphertext for `identity`, all zeroes if there is none.
///
/// `identity` is only read by the seeds constraint, as in [`has_submitted`].
#[allow(unused_variables)]
pub fn get_encrypted_data(ctx: Context<SubmissionQuery>, identity: Pubkey) -> Result<[u8; 32]> {
    Ok(load_record(&ctx)?.map(|r| r.ciphertext()).unwrap_or([0; 32]))
}
