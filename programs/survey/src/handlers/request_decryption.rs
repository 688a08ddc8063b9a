use anchor_lang::prelude::*;
use arcium_anchor::prelude::*;
use arcium_client::idl::arcium::types::CallbackAccount;

use crate::{
    constants::ANSWER_STATE_OFFSET,
    error::ErrorCode,
    state::AnswerDecryptedEvent,
    survey::{InitRevealAnswerCompDef, RequestDecryption, RevealAnswerCallback, RevealAnswerOutput},
};

/// One-off job to create computation definition for `reveal_answer` in encrypted-ixs/src/lib.rs.
pub fn init_reveal_answer_comp_def(ctx: Context<InitRevealAnswerCompDef>) -> Result<()> {
    init_comp_def(ctx.accounts, None, None)?;
    Ok(())
}

/// Asks the cluster to re-encrypt the signer's stored answer to `requester_pubkey`.
///
/// Only the participant who submitted may ask. The result arrives in an
/// `AnswerDecryptedEvent` that only the holder of the matching x25519 secret
/// can open.
pub fn request_decryption(
    ctx: Context<RequestDecryption>,
    computation_offset: u64,
    requester_pubkey: [u8; 32],
    requester_nonce: u128,
) -> Result<()> {
    let submission = &ctx.accounts.submission_account;
    require_keys_eq!(
        submission.identity,
        ctx.accounts.payer.key(),
        ErrorCode::Unauthorized
    );
    require!(submission.present, ErrorCode::NoSubmission);

    msg!("Requesting decryption for {}", submission.identity);

    let computation_args = ArgBuilder::new()
        .x25519_pubkey(requester_pubkey)
        .plaintext_u128(requester_nonce)
        .plaintext_u128(submission.nonce)
        .account(submission.key(), ANSWER_STATE_OFFSET, 32)
        .build();

    let callback = RevealAnswerCallback::callback_ix(
        computation_offset,
        &ctx.accounts.mxe_account,
        &[CallbackAccount {
            pubkey: submission.key(),
            is_writable: false,
        }],
    )?;

    ctx.accounts.sign_pda_account.bump = ctx.bumps.sign_pda_account;

    queue_computation(
        ctx.accounts,
        computation_offset,
        computation_args,
        None,
        vec![callback],
        1,
        0,
    )?;
    Ok(())
}

pub fn reveal_answer_callback(
    ctx: Context<RevealAnswerCallback>,
    output: SignedComputationOutputs<RevealAnswerOutput>,
) -> Result<()> {
    let RevealAnswerOutput { field_0: answer } = output.verify_output(
        &ctx.accounts.cluster_account,
        &ctx.accounts.computation_account,
    )?;

    emit!(AnswerDecryptedEvent {
        identity: ctx.accounts.submission_account.identity,
        ciphertext: answer.ciphertexts[0],
        nonce: answer.nonce.to_le_bytes(),
    });

    Ok(())
}
