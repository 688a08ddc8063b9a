use arcium_anchor::prelude::*;

// Computation definition offsets for each encrypted instruction
pub const COMP_DEF_OFFSET_VALIDATE_ANSWER: u32 = comp_def_offset("validate_answer");
pub const COMP_DEF_OFFSET_REVEAL_ANSWER: u32 = comp_def_offset("reveal_answer");

/// PDA seed for a participant's submission record
pub const SUBMISSION_SEED: &[u8] = b"submission";

/// Byte offset of `answer_state` inside a `SubmissionAccount`: discriminator + 1 byte (bump)
pub const ANSWER_STATE_OFFSET: u32 = 8 + 1;
