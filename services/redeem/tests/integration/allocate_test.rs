use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use futures::future::join_all;

use offercode_redeem::domain::types::{Allocation, AllocationPolicy};
use offercode_redeem::error::{IssuerError, RedeemServiceError};
use offercode_redeem::usecase::allocate::AllocateUseCase;

use crate::helpers::{
    InMemoryCodeRepo, MockIssuer, OTHER_STUDENT, STUDENT, claimed_code, policy,
    short_validity_policy, unclaimed_code,
};

fn allocator(
    repo: InMemoryCodeRepo,
    issuer: MockIssuer,
    policy: AllocationPolicy,
) -> AllocateUseCase<InMemoryCodeRepo, MockIssuer> {
    AllocateUseCase {
        codes: repo,
        issuer,
        policy,
    }
}

#[tokio::test]
async fn should_claim_available_code_without_replenishing() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let repo = InMemoryCodeRepo::new(vec![unclaimed_code("X", now + Duration::days(30))]);
    let issuer = MockIssuer::default();
    let uc = allocator(repo.clone(), issuer.clone(), policy());

    let result = uc.execute(STUDENT, now).await.unwrap();

    let Allocation::Claimed(code) = result else {
        panic!("expected Claimed, got {result:?}");
    };
    assert_eq!(code.value, "X");
    assert_eq!(code.claimed_by.as_deref(), Some(STUDENT));
    assert_eq!(code.claimed_at, Some(now));
    assert!(code.redeemed);
    assert_eq!(issuer.mint_count(), 0);

    let stored = repo.codes_handle();
    let stored = stored.lock().unwrap();
    assert!(stored[0].redeemed, "claim must be persisted in the store");
}

#[tokio::test]
async fn should_return_not_eligible_with_last_claim_time() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let last = now - Duration::days(100);
    let repo = InMemoryCodeRepo::new(vec![
        claimed_code("OLD", STUDENT, last),
        unclaimed_code("X", now + Duration::days(30)),
    ]);
    let uc = allocator(repo.clone(), MockIssuer::default(), policy());

    let result = uc.execute(STUDENT, now).await.unwrap();

    assert_eq!(
        result,
        Allocation::NotEligible {
            last_claimed_at: last
        }
    );
    assert_eq!(repo.claim_calls(), 0, "ineligible requester must not claim");
}

#[tokio::test]
async fn should_replenish_once_and_claim_from_new_batch() {
    let now = Utc::now();
    let issuer = MockIssuer::with_batches(vec![vec!["NEW1", "NEW2", "NEW3"]]);
    let repo = InMemoryCodeRepo::empty();
    let uc = allocator(repo.clone(), issuer.clone(), policy());

    let result = uc.execute(STUDENT, now).await.unwrap();

    let Allocation::Claimed(code) = result else {
        panic!("expected Claimed, got {result:?}");
    };
    assert!(code.value.starts_with("NEW"));
    assert_eq!(issuer.mint_count(), 1);
    assert_eq!(repo.claim_calls(), 2);
    assert_eq!(repo.codes_handle().lock().unwrap().len(), 3);
}

#[tokio::test]
async fn should_declare_exhausted_after_exactly_one_replenishment() {
    let now = Utc::now();
    // minted codes expire inside the safety buffer, so the retry finds nothing
    let issuer = MockIssuer::with_batches(vec![vec!["SHORT1"], vec!["SHORT2"]]);
    let repo = InMemoryCodeRepo::empty();
    let uc = allocator(repo.clone(), issuer.clone(), short_validity_policy());

    let result = uc.execute(STUDENT, now).await.unwrap();

    assert_eq!(result, Allocation::Exhausted);
    assert_eq!(issuer.mint_count(), 1, "exactly one replenishment attempt");
    assert_eq!(repo.claim_calls(), 2, "exactly one retry");
}

#[tokio::test]
async fn should_never_hand_out_code_inside_expiry_buffer() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let repo = InMemoryCodeRepo::new(vec![
        unclaimed_code("SOON", now + Duration::days(6)),
        unclaimed_code("EDGE", now + Duration::days(7)),
    ]);
    let issuer = MockIssuer::with_batches(vec![vec!["FRESH"]]);
    let uc = allocator(repo.clone(), issuer.clone(), policy());

    let result = uc.execute(STUDENT, now).await.unwrap();

    let Allocation::Claimed(code) = result else {
        panic!("expected Claimed, got {result:?}");
    };
    assert_eq!(code.value, "FRESH");
    assert_eq!(issuer.mint_count(), 1);
    let stored = repo.codes_handle();
    let stored = stored.lock().unwrap();
    assert!(
        stored
            .iter()
            .filter(|c| c.value == "SOON" || c.value == "EDGE")
            .all(|c| !c.redeemed)
    );
}

#[tokio::test]
async fn should_prefer_soonest_expiring_claimable_code() {
    let now = Utc::now();
    let repo = InMemoryCodeRepo::new(vec![
        unclaimed_code("LATE", now + Duration::days(120)),
        unclaimed_code("EARLY", now + Duration::days(20)),
    ]);
    let uc = allocator(repo, MockIssuer::default(), policy());

    let Allocation::Claimed(code) = uc.execute(STUDENT, now).await.unwrap() else {
        panic!("expected Claimed");
    };
    assert_eq!(code.value, "EARLY");
}

#[tokio::test]
async fn should_surface_issuer_failure_during_replenishment() {
    let uc = allocator(InMemoryCodeRepo::empty(), MockIssuer::rejecting(403), policy());

    let result = uc.execute(STUDENT, Utc::now()).await;

    assert!(
        matches!(
            result,
            Err(RedeemServiceError::Issuer(IssuerError::MintRejected(403)))
        ),
        "expected MintRejected(403), got {result:?}"
    );
}

#[tokio::test]
async fn should_surface_empty_export_as_issuer_error() {
    let issuer = MockIssuer::with_batches(vec![vec![]]);
    let uc = allocator(InMemoryCodeRepo::empty(), issuer, policy());

    let result = uc.execute(STUDENT, Utc::now()).await;

    assert!(
        matches!(
            result,
            Err(RedeemServiceError::Issuer(IssuerError::EmptyExport))
        ),
        "expected EmptyExport, got {result:?}"
    );
}

#[tokio::test]
async fn should_surface_claim_failure() {
    let repo = InMemoryCodeRepo {
        fail_claim: true,
        ..InMemoryCodeRepo::new(vec![unclaimed_code("X", Utc::now() + Duration::days(30))])
    };
    let issuer = MockIssuer::default();
    let uc = allocator(repo, issuer.clone(), policy());

    let result = uc.execute(STUDENT, Utc::now()).await;

    assert!(matches!(result, Err(RedeemServiceError::Store(_))));
    assert_eq!(issuer.mint_count(), 0, "a failed claim is not a pool miss");
}

#[tokio::test]
async fn should_give_distinct_codes_under_contention() {
    let now = Utc::now();
    let pool = ["P1", "P2", "P3"];
    let repo = InMemoryCodeRepo::new(
        pool.iter()
            .map(|v| unclaimed_code(v, now + Duration::days(60)))
            .collect(),
    );
    // every replenishment yields only codes inside the buffer
    let short_lived: Vec<String> = (0..10).map(|i| format!("SHORT{i}")).collect();
    let issuer = MockIssuer::with_batches(short_lived.iter().map(|c| vec![c.as_str()]).collect());
    let uc = allocator(repo.clone(), issuer, short_validity_policy());

    let requesters: Vec<String> = (0..10).map(|i| format!("s{i}@uni.edu")).collect();
    let results = join_all(requesters.iter().map(|r| uc.execute(r, now))).await;

    let mut claimed = Vec::new();
    let mut exhausted = 0;
    for result in results {
        match result.unwrap() {
            Allocation::Claimed(code) => claimed.push(code.value),
            Allocation::Exhausted => exhausted += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    let distinct: HashSet<_> = claimed.iter().cloned().collect();
    assert_eq!(claimed.len(), pool.len());
    assert_eq!(distinct.len(), claimed.len(), "a code was issued twice");
    assert_eq!(exhausted, 10 - pool.len());

    let stored = repo.codes_handle();
    for code in stored.lock().unwrap().iter().filter(|c| c.redeemed) {
        assert_eq!(code.claimed_at, Some(now));
        assert!(code.claimed_by.is_some());
    }
}

#[tokio::test]
async fn should_split_single_code_between_two_concurrent_requesters() {
    let now = Utc::now();
    let repo = InMemoryCodeRepo::new(vec![unclaimed_code("X", now + Duration::days(30))]);
    let issuer = MockIssuer::with_batches(vec![vec!["NEW1"], vec!["NEW2"]]);
    let uc = allocator(repo, issuer.clone(), policy());

    let (a, b) = tokio::join!(uc.execute(STUDENT, now), uc.execute(OTHER_STUDENT, now));

    let values: Vec<String> = [a.unwrap(), b.unwrap()]
        .into_iter()
        .map(|r| match r {
            Allocation::Claimed(code) => code.value,
            other => panic!("expected Claimed, got {other:?}"),
        })
        .collect();
    assert!(values.contains(&"X".to_owned()));
    assert_ne!(values[0], values[1]);
    assert_eq!(issuer.mint_count(), 1);
}
