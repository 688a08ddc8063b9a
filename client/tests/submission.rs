mod common;

use std::sync::Arc;

use common::Harness;
use survey_client::{
    codec, AnswerDraft, AnswerVector, CiphertextHandle, Encryptor, Identity, SubmissionState,
    SubmissionStore, SurveyError, ValidityProof,
};

async fn encrypt_for(h: &Harness, identity: Identity, index: u64) -> (CiphertextHandle, ValidityProof) {
    h.fhe
        .encrypt(codec::ANSWER_FIELD_TYPE, index, h.guard.scope(), identity)
        .await
        .unwrap()
        .into_single()
        .unwrap()
}

#[tokio::test]
async fn lowest_answer_round_trips() {
    let answer = AnswerVector::new([1, 1, 1, 1, 1]).unwrap();
    let index = codec::encode(&answer);
    assert_eq!(index.value(), 1);
    assert_eq!(codec::decode(index), answer);

    let description = codec::describe(index.value() as i64);
    assert!(description.is_valid());
    assert!(!description.to_string().is_empty());
}

#[tokio::test]
async fn highest_answer_round_trips() {
    let answer = AnswerVector::new([4, 4, 4, 4, 4]).unwrap();
    let index = codec::encode(&answer);
    assert_eq!(index.value(), 1024);
    assert_eq!(codec::decode(index), answer);
    assert_eq!(
        codec::describe(1024).to_string(),
        "Very high heart, Very high BP, Very high sugar, Very high cholesterol, High fever"
    );
}

#[tokio::test]
async fn fresh_identity_has_nothing_stored() {
    let h = Harness::new();
    let carol = h.signer().identity();
    assert!(!h.guard.has_submitted(&carol));
    assert_eq!(h.guard.get_encrypted_data(&carol), CiphertextHandle::ABSENT);
}

#[tokio::test]
async fn second_submission_is_rejected_regardless_of_payload() {
    let h = Harness::new();
    let bob = h.signer().identity();

    let (first, proof) = encrypt_for(&h, bob, 1111 % 1024).await;
    h.guard.submit(&bob, first, proof).await.unwrap();
    assert!(h.guard.has_submitted(&bob));

    let (second, proof) = encrypt_for(&h, bob, 2222 % 1024).await;
    let err = h.guard.submit(&bob, second, proof).await.unwrap_err();
    assert_eq!(err, SurveyError::DuplicateSubmission { identity: bob });

    let err = h
        .guard
        .submit(&bob, second, ValidityProof::new(vec![0u8; 32]))
        .await
        .unwrap_err();
    assert_eq!(err, SurveyError::DuplicateSubmission { identity: bob });

    assert_eq!(h.guard.get_encrypted_data(&bob), first);
    assert_eq!(h.store.submission_count(), 1);
}

#[tokio::test]
async fn same_value_from_two_identities_gives_distinct_handles() {
    let h = Harness::new();
    let alice = h.signer().identity();
    let bob = h.signer().identity();

    let (a, proof_a) = encrypt_for(&h, alice, 1).await;
    let (b, proof_b) = encrypt_for(&h, bob, 1).await;
    h.guard.submit(&alice, a, proof_a).await.unwrap();
    h.guard.submit(&bob, b, proof_b).await.unwrap();

    assert_ne!(h.guard.get_encrypted_data(&alice), h.guard.get_encrypted_data(&bob));
}

#[tokio::test]
async fn proof_is_bound_to_submitter() {
    let h = Harness::new();
    let alice = h.signer().identity();
    let mallory = h.signer().identity();

    let (handle, proof) = encrypt_for(&h, alice, 42).await;
    let err = h.guard.submit(&mallory, handle, proof).await.unwrap_err();
    assert_eq!(err, SurveyError::InvalidProof { identity: mallory });
    assert!(!h.guard.has_submitted(&mallory));

    let (other, _) = encrypt_for(&h, alice, 43).await;
    let (_, proof) = encrypt_for(&h, alice, 44).await;
    let err = h.guard.submit(&alice, other, proof).await.unwrap_err();
    assert_eq!(err, SurveyError::InvalidProof { identity: alice });
    assert_eq!(h.store.submission_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_for_one_identity_yield_one_record() {
    let h = Arc::new(Harness::new());
    let x = h.signer().identity();

    let mut tasks = Vec::new();
    for value in [10u64, 20] {
        let (handle, proof) = encrypt_for(&h, x, value).await;
        let guard = h.guard.clone();
        tasks.push(tokio::spawn(async move { guard.submit(&x, handle, proof).await }));
    }

    let mut successes = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(ack) => {
                assert_eq!(ack.identity, x);
                successes += 1;
            }
            Err(SurveyError::DuplicateSubmission { identity }) => {
                assert_eq!(identity, x);
                duplicates += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!((successes, duplicates), (1, 1));
    assert_eq!(h.store.submission_count(), 1);
    assert!(h.store.has_submitted(&x));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_orchestrators_for_one_identity() {
    let h = Harness::new();
    let signer = h.signer();
    let first = h.orchestrator(signer.clone());
    let second = h.orchestrator(signer.clone());
    let draft = AnswerDraft::from_fields([2, 2, 3, 1, 4]);

    let (a, b) = tokio::join!(first.submit(&draft), second.submit(&draft));
    let outcomes = [a, b];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(SurveyError::DuplicateSubmission { .. })
    )));
    assert_eq!(h.store.submission_count(), 1);

    let states = [first.submission_state(), second.submission_state()];
    assert!(states.iter().any(|s| matches!(s, SubmissionState::Confirmed(_))));
    assert!(states.iter().any(|s| matches!(s, SubmissionState::Failed(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_identities_submit_in_parallel() {
    let h = Arc::new(Harness::new());
    let mut tasks = Vec::new();
    for i in 0..16u8 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            let participant = h.participant();
            let draft = AnswerDraft::from_fields([1 + i % 4, 1 + (i / 4) % 4, 1, 2, 3]);
            participant.submit(&draft).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(h.store.submission_count(), 16);
}
