use arcis_imports::*;

#[encrypted]
mod circuits {
    use arcis_imports::*;

    /// A participant's encoded survey answer as stored.
    /// `index` packs the five graded fields into 1..=1024.
    pub struct SurveyAnswer {
        index: u16,
    }

    /// A survey answer as submitted.
    ///
    /// `owner` and `record` are the submitter's address and the address of the
    /// record the answer is written to, each split into two little-endian
    /// u128 halves. They are encrypted together with the index, so a
    /// ciphertext copied from someone else's submission does not validate.
    pub struct SubmittedAnswer {
        index: u16,
        owner: [u128; 2],
        record: [u128; 2],
    }

    /// Checks a freshly submitted answer and takes custody of it.
    ///
    /// The answer arrives encrypted under the participant's shared key. It is
    /// re-encrypted to the cluster so it can be stored on-chain and later
    /// re-encrypted for whoever is authorized to read it. Only the validity
    /// bit is revealed; the index itself never leaves MPC.
    ///
    /// # Arguments
    /// * `answer_ctxt` - The participant's encrypted answer
    /// * `owner_lo`, `owner_hi` - The transaction signer's address
    /// * `record_lo`, `record_hi` - The submission record's address
    /// * `mxe` - Cluster key the answer is handed to
    ///
    /// # Returns
    /// The index encrypted to the MXE, and whether the index lies in 1..=1024
    /// and the answer was encrypted for this signer and this record
    #[instruction]
    pub fn validate_answer(
        answer_ctxt: Enc<Shared, SubmittedAnswer>,
        owner_lo: u128,
        owner_hi: u128,
        record_lo: u128,
        record_hi: u128,
        mxe: Mxe,
    ) -> (Enc<Mxe, SurveyAnswer>, bool) {
        let submitted = answer_ctxt.to_arcis();

        // Every comparison runs regardless of the values
        let in_range = submitted.index >= 1 && submitted.index <= 1024;
        let bound = submitted.owner[0] == owner_lo
            && submitted.owner[1] == owner_hi
            && submitted.record[0] == record_lo
            && submitted.record[1] == record_hi;
        let valid = in_range && bound;

        let answer = SurveyAnswer {
            index: submitted.index,
        };
        (mxe.from_arcis(answer), valid.reveal())
    }

    /// Hands a stored answer back to a requester.
    ///
    /// The answer is re-encrypted under the requester's x25519 key, so only the
    /// holder of that key can read it. Nothing is revealed to the cluster or
    /// the chain.
    ///
    /// # Arguments
    /// * `requester` - Key the answer is re-encrypted to
    /// * `answer_ctxt` - The stored answer
    #[instruction]
    pub fn reveal_answer(
        requester: Shared,
        answer_ctxt: Enc<Mxe, SurveyAnswer>,
    ) -> Enc<Shared, SurveyAnswer> {
        let answer = answer_ctxt.to_arcis();
        requester.from_arcis(answer)
    }
}
