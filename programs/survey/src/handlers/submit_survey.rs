use anchor_lang::prelude::*;
use arcium_anchor::prelude::*;
use arcium_client::idl::arcium::types::CallbackAccount;

use crate::{
    error::ErrorCode,
    state::{address_halves, SubmissionEvent, SubmissionRejectedEvent},
    survey::{
        InitValidateAnswerCompDef, SubmitSurvey, ValidateAnswerCallback, ValidateAnswerOutput,
        ValidateAnswerOutputStruct0,
    },
};

/// One-off job to create computation definition for `validate_answer` in encrypted-ixs/src/lib.rs.
///
/// Must be called once before any survey can be submitted.
pub fn init_validate_answer_comp_def(ctx: Context<InitValidateAnswerCompDef>) -> Result<()> {
    init_comp_def(ctx.accounts, None, None)?;
    Ok(())
}

/// Submits an encrypted survey answer for the signer.
///
/// The signer's submission PDA is the write-once record. It is reserved here
/// (`pending`) and filled in by the callback once MPC has confirmed the
/// answer is a valid index encrypted for this signer and this record. A
/// signer with a record that is present or still pending is rejected.
///
/// # Arguments
/// * `answer_ciphertext` - `SubmittedAnswer` ciphertexts: the encoded answer
///   (1..=1024) as a u16, then the signer's address and the record's address
///   as two u128 halves each
/// * `encryption_pubkey` - Participant's x25519 key the answer was encrypted with
/// * `nonce` - Nonce of the answer encryption
/// * `mxe_nonce` - Fresh nonce for re-encrypting the answer to the cluster
pub fn submit_survey(
    ctx: Context<SubmitSurvey>,
    computation_offset: u64,
    answer_ciphertext: [[u8; 32]; 5],
    encryption_pubkey: [u8; 32],
    nonce: u128,
    mxe_nonce: u128,
) -> Result<()> {
    let record = ctx.accounts.submission_account.key();
    let submission = &mut ctx.accounts.submission_account;
    require!(
        !submission.present && !submission.pending,
        ErrorCode::DuplicateSubmission
    );
    require!(
        answer_ciphertext.iter().all(|c| *c != [0; 32]),
        ErrorCode::InvalidProof
    );

    submission.bump = ctx.bumps.submission_account;
    submission.identity = ctx.accounts.payer.key();
    submission.pending = true;

    msg!("Validating survey submission from {}", submission.identity);

    let [owner_lo, owner_hi] = address_halves(&submission.identity);
    let [record_lo, record_hi] = address_halves(&record);
    let [index, owner_0, owner_1, record_0, record_1] = answer_ciphertext;

    let computation_args = ArgBuilder::new()
        .x25519_pubkey(encryption_pubkey)
        .plaintext_u128(nonce)
        .encrypted_u16(index)
        .encrypted_u128(owner_0)
        .encrypted_u128(owner_1)
        .encrypted_u128(record_0)
        .encrypted_u128(record_1)
        .plaintext_u128(owner_lo)
        .plaintext_u128(owner_hi)
        .plaintext_u128(record_lo)
        .plaintext_u128(record_hi)
        .plaintext_u128(mxe_nonce)
        .build();

    ctx.accounts.sign_pda_account.bump = ctx.bumps.sign_pda_account;

    let callback = ValidateAnswerCallback::callback_ix(
        computation_offset,
        &ctx.accounts.mxe_account,
        &[CallbackAccount {
            pubkey: record,
            is_writable: true,
        }],
    )?;

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

/// Settles the pending record with the validation result.
///
/// An invalid answer, an aborted computation or an output that fails its
/// signature check all leave the record absent and unlock the signer. The
/// callback still succeeds in those cases so the cleared flag is persisted.
pub fn validate_answer_callback(
    ctx: Context<ValidateAnswerCallback>,
    output: SignedComputationOutputs<ValidateAnswerOutput>,
) -> Result<()> {
    let stored = match output.verify_output(
        &ctx.accounts.cluster_account,
        &ctx.accounts.computation_account,
    ) {
        Ok(ValidateAnswerOutput {
            field_0:
                ValidateAnswerOutputStruct0 {
                    field_0: answer,
                    field_1: true,
                },
        }) => Some((answer.ciphertexts[0], answer.nonce)),
        Ok(_) => None,
        Err(err) => {
            msg!("Validation computation failed: {:?}", err);
            None
        }
    };

    let submission = &mut ctx.accounts.submission_account;
    let stored = submission.settle(stored)?;
    let timestamp = Clock::get()?.unix_timestamp;

    if !stored {
        msg!("Rejected survey submission from {}", submission.identity);
        emit!(SubmissionRejectedEvent {
            identity: submission.identity,
            timestamp,
        });
        return Ok(());
    }

    emit!(SubmissionEvent {
        identity: submission.identity,
        timestamp,
    });

    Ok(())
}
