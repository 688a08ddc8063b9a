// Stops Rust Analyzer complaining about missing configs
// See https://solana.stackexchange.com/questions/17777
#![allow(unexpected_cfgs)]
// Fix warning: use of deprecated method `anchor_lang::prelude::AccountInfo::<'a>::realloc`: Use AccountInfo::resize() instead
// See https://solana.stackexchange.com/questions/22979
#![allow(deprecated)]

use anchor_lang::prelude::*;
use arcium_anchor::prelude::*;

pub mod constants;
pub mod error;
pub mod handlers;
pub mod state;

use constants::*;
pub use error::ErrorCode;
pub use state::SubmissionAccount;

declare_id!("EDBCVzoxzVQ86yBi78HksMf4wM9s6fex2F9znHLHRPb3");

#[arcium_program]
pub mod survey {
    use super::*;

    pub fn init_validate_answer_comp_def(ctx: Context<InitValidateAnswerCompDef>) -> Result<()> {
        handlers::submit_survey::init_validate_answer_comp_def(ctx)
    }

    pub fn submit_survey(
        ctx: Context<SubmitSurvey>,
        computation_offset: u64,
        answer_ciphertext: [[u8; 32]; 5],
        encryption_pubkey: [u8; 32],
        nonce: u128,
        mxe_nonce: u128,
    ) -> Result<()> {
        handlers::submit_survey::submit_survey(
            ctx,
            computation_offset,
            answer_ciphertext,
            encryption_pubkey,
            nonce,
            mxe_nonce,
        )
    }

    #[arcium_callback(encrypted_ix = "validate_answer")]
    pub fn validate_answer_callback(
        ctx: Context<ValidateAnswerCallback>,
        output: SignedComputationOutputs<ValidateAnswerOutput>,
    ) -> Result<()> {
        handlers::submit_survey::validate_answer_callback(ctx, output)
    }

    pub fn init_reveal_answer_comp_def(ctx: Context<InitRevealAnswerCompDef>) -> Result<()> {
        handlers::request_decryption::init_reveal_answer_comp_def(ctx)
    }

    pub fn request_decryption(
        ctx: Context<RequestDecryption>,
        computation_offset: u64,
        requester_pubkey: [u8; 32],
        requester_nonce: u128,
    ) -> Result<()> {
        handlers::request_decryption::request_decryption(
            ctx,
            computation_offset,
            requester_pubkey,
            requester_nonce,
        )
    }

    #[arcium_callback(encrypted_ix = "reveal_answer")]
    pub fn reveal_answer_callback(
        ctx: Context<RevealAnswerCallback>,
        output: SignedComputationOutputs<RevealAnswerOutput>,
    ) -> Result<()> {
        handlers::request_decryption::reveal_answer_callback(ctx, output)
    }

    pub fn has_submitted(ctx: Context<SubmissionQuery>, identity: Pubkey) -> Result<bool> {
        handlers::queries::has_submitted(ctx, identity)
    }

    pub fn get_encrypted_data(ctx: Context<SubmissionQuery>, identity: Pubkey) -> Result<[u8; 32]> {
        handlers::queries::get_encrypted_data(ctx, identity)
    }

    // Account struct definitions - these need to be inside the arcium_program module
    // so they can access the generated SignerAccount type

    #[init_computation_definition_accounts("validate_answer", payer)]
    #[derive(Accounts)]
    pub struct InitValidateAnswerCompDef<'info> {
        #[account(mut)]
        pub payer: Signer<'info>,

        #[account(
            mut,
            address = derive_mxe_pda!()
        )]
        pub mxe_account: Box<Account<'info, MXEAccount>>,

        #[account(mut)]
        /// CHECK: comp_def_account, checked by arcium program.
        /// Can't check it here as it's not initialized yet.
        pub comp_def_account: UncheckedAccount<'info>,

        pub arcium_program: Program<'info, Arcium>,

        pub system_program: Program<'info, System>,
    }

    #[queue_computation_accounts("validate_answer", payer)]
    #[derive(Accounts)]
    #[instruction(computation_offset: u64)]
    pub struct SubmitSurvey<'info> {
        #[account(mut)]
        pub payer: Signer<'info>,

        #[account(
            init_if_needed,
            space = 9,
            payer = payer,
            seeds = [&SIGN_PDA_SEED],
            bump,
            address = derive_sign_pda!(),
        )]
        pub sign_pda_account: Account<'info, SignerAccount>,

        #[account(
            address = derive_mxe_pda!()
        )]
        pub mxe_account: Account<'info, MXEAccount>,

        #[account(
            mut,
            address = derive_mempool_pda!()
        )]
        /// CHECK: mempool_account, checked by the arcium program
        pub mempool_account: UncheckedAccount<'info>,

        #[account(
            mut,
            address = derive_execpool_pda!()
        )]
        /// CHECK: executing_pool, checked by the arcium program
        pub executing_pool: UncheckedAccount<'info>,

        #[account(
            mut,
            address = derive_comp_pda!(computation_offset)
        )]
        /// CHECK: computation_account, checked by the arcium program.
        pub computation_account: UncheckedAccount<'info>,

        #[account(
            address = derive_comp_def_pda!(COMP_DEF_OFFSET_VALIDATE_ANSWER)
        )]
        pub comp_def_account: Account<'info, ComputationDefinitionAccount>,

        #[account(
            mut,
            address = derive_cluster_pda!(mxe_account, ErrorCode::ClusterNotSet)
        )]
        pub cluster_account: Account<'info, Cluster>,

        #[account(
            mut,
            address = ARCIUM_FEE_POOL_ACCOUNT_ADDRESS,
        )]
        pub pool_account: Account<'info, FeePool>,

        #[account(
            address = ARCIUM_CLOCK_ACCOUNT_ADDRESS,
        )]
        pub clock_account: Account<'info, ClockAccount>,

        pub system_program: Program<'info, System>,

        pub arcium_program: Program<'info, Arcium>,

        #[account(
            init_if_needed,
            payer = payer,
            space = 8 + SubmissionAccount::INIT_SPACE,
            seeds = [SUBMISSION_SEED, payer.key().as_ref()],
            bump,
        )]
        pub submission_account: Account<'info, SubmissionAccount>,
    }

    #[callback_accounts("validate_answer")]
    #[derive(Accounts)]
    pub struct ValidateAnswerCallback<'info> {
        pub arcium_program: Program<'info, Arcium>,

        #[account(
            address = derive_comp_def_pda!(COMP_DEF_OFFSET_VALIDATE_ANSWER)
        )]
        pub comp_def_account: Account<'info, ComputationDefinitionAccount>,

        #[account(
            address = derive_mxe_pda!()
        )]
        pub mxe_account: Account<'info, MXEAccount>,

        /// CHECK: computation_account, checked by arcium program via constraints in the callback context.
        pub computation_account: UncheckedAccount<'info>,

        #[account(
            address = derive_cluster_pda!(mxe_account, ErrorCode::ClusterNotSet)
        )]
        pub cluster_account: Account<'info, Cluster>,

        #[account(address = ::anchor_lang::solana_program::sysvar::instructions::ID)]
        /// CHECK: instructions_sysvar, checked by the account constraint
        pub instructions_sysvar: AccountInfo<'info>,

        /// CHECK: submission_account, checked by the callback account key passed in queue_computation
        #[account(mut)]
        pub submission_account: Account<'info, SubmissionAccount>,
    }

    #[init_computation_definition_accounts("reveal_answer", payer)]
    #[derive(Accounts)]
    pub struct InitRevealAnswerCompDef<'info> {
        #[account(mut)]
        pub payer: Signer<'info>,

        #[account(
            mut,
            address = derive_mxe_pda!()
        )]
        pub mxe_account: Box<Account<'info, MXEAccount>>,

        #[account(mut)]
        /// CHECK: comp_def_account, checked by arcium program.
        /// Can't check it here as it's not initialized yet.
        pub comp_def_account: UncheckedAccount<'info>,

        pub arcium_program: Program<'info, Arcium>,

        pub system_program: Program<'info, System>,
    }

    #[queue_computation_accounts("reveal_answer", payer)]
    #[derive(Accounts)]
    #[instruction(computation_offset: u64)]
    pub struct RequestDecryption<'info> {
        #[account(mut)]
        pub payer: Signer<'info>,

        #[account(
            init_if_needed,
            space = 9,
            payer = payer,
            seeds = [&SIGN_PDA_SEED],
            bump,
            address = derive_sign_pda!(),
        )]
        pub sign_pda_account: Account<'info, SignerAccount>,

        #[account(
            address = derive_mxe_pda!()
        )]
        pub mxe_account: Account<'info, MXEAccount>,

        #[account(
            mut,
            address = derive_mempool_pda!()
        )]
        /// CHECK: mempool_account, checked by the arcium program
        pub mempool_account: UncheckedAccount<'info>,

        #[account(
            mut,
            address = derive_execpool_pda!()
        )]
        /// CHECK: executing_pool, checked by the arcium program
        pub executing_pool: UncheckedAccount<'info>,

        #[account(
            mut,
            address = derive_comp_pda!(computation_offset)
        )]
        /// CHECK: computation_account, checked by the arcium program.
        pub computation_account: UncheckedAccount<'info>,

        #[account(
            address = derive_comp_def_pda!(COMP_DEF_OFFSET_REVEAL_ANSWER)
        )]
        pub comp_def_account: Account<'info, ComputationDefinitionAccount>,

        #[account(
            mut,
            address = derive_cluster_pda!(mxe_account, ErrorCode::ClusterNotSet)
        )]
        pub cluster_account: Account<'info, Cluster>,

        #[account(
            mut,
            address = ARCIUM_FEE_POOL_ACCOUNT_ADDRESS,
        )]
        pub pool_account: Account<'info, FeePool>,

        #[account(
            address = ARCIUM_CLOCK_ACCOUNT_ADDRESS,
        )]
        pub clock_account: Account<'info, ClockAccount>,

        pub system_program: Program<'info, System>,

        pub arcium_program: Program<'info, Arcium>,

        #[account(
            seeds = [SUBMISSION_SEED, payer.key().as_ref()],
            bump = submission_account.bump,
        )]
        pub submission_account: Account<'info, SubmissionAccount>,
    }

    #[callback_accounts("reveal_answer")]
    #[derive(Accounts)]
    pub struct RevealAnswerCallback<'info> {
        pub arcium_program: Program<'info, Arcium>,

        #[account(
            address = derive_comp_def_pda!(COMP_DEF_OFFSET_REVEAL_ANSWER)
        )]
        pub comp_def_account: Account<'info, ComputationDefinitionAccount>,

        #[account(
            address = derive_mxe_pda!()
        )]
        pub mxe_account: Account<'info, MXEAccount>,

        /// CHECK: computation_account, checked by arcium program via constraints in the callback context.
        pub computation_account: UncheckedAccount<'info>,

        #[account(
            address = derive_cluster_pda!(mxe_account, ErrorCode::ClusterNotSet)
        )]
        pub cluster_account: Account<'info, Cluster>,

        #[account(address = ::anchor_lang::solana_program::sysvar::instructions::ID)]
        /// CHECK: instructions_sysvar, checked by the account constraint
        pub instructions_sysvar: AccountInfo<'info>,

        /// CHECK: submission_account, checked by the callback account key passed in queue_computation
        pub submission_account: Account<'info, SubmissionAccount>,
    }

    /// Read-only view of one participant's record. The account may not exist yet.
    #[derive(Accounts)]
    #[instruction(identity: Pubkey)]
    pub struct SubmissionQuery<'info> {
        #[account(
            seeds = [SUBMISSION_SEED, identity.as_ref()],
            bump,
        )]
        /// CHECK: submission_account, address checked by seeds, owner and contents checked on load
        pub submission_account: UncheckedAccount<'info>,
    }
}

pub use survey::{
    InitRevealAnswerCompDef, InitValidateAnswerCompDef, RequestDecryption, RevealAnswerCallback,
    RevealAnswerOutput, SubmissionQuery, SubmitSurvey, ValidateAnswerCallback,
    ValidateAnswerOutput,
};
