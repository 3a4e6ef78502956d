//! Property tests for access token issue and validation.

mod common;

use chrono::Duration;
use flashcards_core::ports::{CredentialService, InvalidCredential};
use flashcards_core::Plan;
use proptest::prelude::*;
use uuid::Uuid;

fn plan() -> impl Strategy<Value = Plan> {
    prop_oneof![Just(Plan::Free), Just(Plan::Pro), Just(Plan::Admin)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn issued_tokens_validate_to_their_claims(
        id in any::<u128>(),
        local in "[a-z0-9._]{1,20}",
        plan in plan(),
        hours in 1i64..=24 * 30,
    ) {
        let codec = common::credentials();
        let subject = Uuid::from_u128(id);
        let email = format!("{local}@example.com");

        let issued = codec.issue(subject, &email, plan, Duration::hours(hours)).unwrap();
        let claims = codec.validate(&issued.token).unwrap();

        prop_assert_eq!(claims.sub, subject);
        prop_assert_eq!(claims.email, email);
        prop_assert_eq!(claims.plan, plan);
        prop_assert_eq!(claims.exp - claims.iat, hours * 3600);
        prop_assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn any_single_byte_change_is_rejected(id in any::<u128>(), pick in any::<prop::sample::Index>()) {
        let codec = common::credentials();
        let issued = codec
            .issue(Uuid::from_u128(id), "ada@example.com", Plan::Free, Duration::hours(1))
            .unwrap();

        let mut bytes = issued.token.into_bytes();
        let at = pick.index(bytes.len());
        bytes[at] ^= 0x01;
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert_eq!(codec.validate(&tampered), Err(InvalidCredential));
    }
}

#[tokio::test]
async fn zero_ttl_token_is_dead_after_its_expiry() {
    let codec = common::credentials();
    let issued = codec
        .issue(Uuid::new_v4(), "ada@example.com", Plan::Pro, Duration::zero())
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert_eq!(codec.validate(&issued.token), Err(InvalidCredential));
}

#[test]
fn garbage_is_rejected() {
    let codec = common::credentials();
    for token in ["", "abc", "a.b.c", "Bearer x.y.z"] {
        assert_eq!(codec.validate(token), Err(InvalidCredential));
    }
}
