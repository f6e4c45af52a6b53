//! End-to-end OAuth handshake tests over in-memory collaborators.

mod common;

use common::{
    jwt_manager, oauth_config, FailingProvider, MemoryInstanceRepository, MemoryOwnerRepository,
    MemoryRespondentRepository, StaticProvider,
};
use formgate::cache::MemoryHandshakeStore;
use formgate::domain::{AuthType, CreateInstanceInput, InstanceStatus, RespondentOrigin, StringUuid};
use formgate::error::AppError;
use formgate::oauth::IdentityProvider;
use formgate::service::{
    AdmissionService, CallbackOutcome, CredentialService, InstanceService, OAuthService,
    RespondentService,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const REDIRECT_URI: &str = "http://localhost:3000/auth";

struct Harness<P: IdentityProvider> {
    respondent_repo: Arc<MemoryRespondentRepository>,
    respondents: Arc<RespondentService<MemoryRespondentRepository>>,
    owners: Arc<MemoryOwnerRepository>,
    service: OAuthService<
        P,
        MemoryHandshakeStore,
        MemoryInstanceRepository,
        MemoryRespondentRepository,
        MemoryOwnerRepository,
    >,
    instance_hash: String,
    instance_id: StringUuid,
}

async fn harness<P: IdentityProvider>(provider: P, stash_ttl: Option<Duration>) -> Harness<P> {
    let instances = Arc::new(MemoryInstanceRepository::new());
    let instance_service = InstanceService::new(instances.clone());
    let instance = instance_service
        .create(
            StringUuid::new_v4(),
            CreateInstanceInput {
                name: "org survey".to_string(),
                description: "restricted to acme.com".to_string(),
                auth_type: AuthType::OpenWithinOrganization,
                status: InstanceStatus::Open,
                allowed_domains: Some(vec!["acme.com".to_string()]),
            },
        )
        .await
        .unwrap();

    let respondent_repo = Arc::new(MemoryRespondentRepository::new());
    let respondents = Arc::new(RespondentService::new(respondent_repo.clone()));
    let owners = Arc::new(MemoryOwnerRepository::new());
    let admission = Arc::new(AdmissionService::new(owners.clone()));
    let credentials = Arc::new(CredentialService::new(respondent_repo.clone(), jwt_manager()).unwrap());
    let store = Arc::new(match stash_ttl {
        Some(ttl) => MemoryHandshakeStore::with_ttl(ttl),
        None => MemoryHandshakeStore::new(),
    });

    let service = OAuthService::new(
        Arc::new(provider),
        store,
        instances,
        respondents.clone(),
        admission,
        credentials,
        oauth_config(),
    );

    Harness {
        respondent_repo,
        respondents,
        owners,
        service,
        instance_hash: instance.hash,
        instance_id: instance.id,
    }
}

fn extract_state(authorization_url: &str) -> String {
    let url = Url::parse(authorization_url).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .expect("authorization URL carries a state parameter")
}

#[tokio::test]
async fn test_start_rejects_unlisted_redirect_uri() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    let err = h
        .service
        .start(&h.instance_hash, "google", "http://evil.test/steal")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_start_rejects_unknown_provider() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    let err = h
        .service
        .start(&h.instance_hash, "github", REDIRECT_URI)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_start_unknown_instance_is_not_found() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    let err = h
        .service
        .start("0000000000000000", "google", REDIRECT_URI)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_admitted_identity_gets_respondent_and_token() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;
    h.owners.add("bob@acme.com");

    let authorization_url = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();
    let state = extract_state(&authorization_url);

    let outcome = h.service.callback("auth-code", &state).await.unwrap();

    let CallbackOutcome::Granted { redirect_url } = outcome else {
        panic!("expected granted outcome");
    };
    assert!(redirect_url.starts_with(&oauth_config().frontend_redirect_url));

    // The redirect carries a verifiable respondent token.
    let url = Url::parse(&redirect_url).unwrap();
    let token = url
        .query_pairs()
        .find(|(k, _)| k == "access")
        .map(|(_, v)| v.to_string())
        .expect("redirect carries the access token");
    let claims = jwt_manager().verify_respondent_token(&token).unwrap();
    assert_eq!(claims.username, "bob@acme.com");

    // A respondent record now exists with OAuth origin.
    let respondent = h
        .respondents
        .get_by_username(
            h.instance_id,
            "bob@acme.com",
            Some(RespondentOrigin::OauthVerified),
        )
        .await
        .unwrap();
    assert_eq!(respondent.first_name, "Bob");

    // The provisional owner account is gone on the accept path too.
    assert!(!h.owners.contains("bob@acme.com"));
}

#[tokio::test]
async fn test_rejected_identity_redirects_to_not_allowed_and_cleans_up() {
    let h = harness(StaticProvider::new("eve@evil.com", "Eve", "Intruder"), None).await;
    h.owners.add("eve@evil.com");

    let authorization_url = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();
    let state = extract_state(&authorization_url);

    let outcome = h.service.callback("auth-code", &state).await.unwrap();

    assert_eq!(
        outcome,
        CallbackOutcome::Denied {
            redirect_url: oauth_config().frontend_not_allowed_url,
        }
    );
    assert_eq!(h.respondent_repo.count(), 0);
    assert!(!h.owners.contains("eve@evil.com"));
}

#[tokio::test]
async fn test_callback_state_is_consumed_once() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    let authorization_url = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();
    let state = extract_state(&authorization_url);

    h.service.callback("auth-code", &state).await.unwrap();

    let err = h.service.callback("auth-code", &state).await.unwrap_err();
    assert!(matches!(err, AppError::HandshakeExpired));
}

#[tokio::test]
async fn test_callback_after_stash_ttl_fails_closed() {
    let h = harness(
        StaticProvider::new("bob@acme.com", "Bob", "Builder"),
        Some(Duration::ZERO),
    )
    .await;

    let authorization_url = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();
    let state = extract_state(&authorization_url);

    let err = h.service.callback("auth-code", &state).await.unwrap_err();
    assert!(matches!(err, AppError::HandshakeExpired));
    assert_eq!(h.respondent_repo.count(), 0);
}

#[tokio::test]
async fn test_callback_with_forged_state_fails_closed() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    let err = h
        .service
        .callback("auth-code", "never-issued-state")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HandshakeExpired));
}

#[tokio::test]
async fn test_provider_failure_surfaces_provider_error() {
    let h = harness(FailingProvider, None).await;

    let authorization_url = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();
    let state = extract_state(&authorization_url);

    let err = h.service.callback("auth-code", &state).await.unwrap_err();
    assert!(matches!(err, AppError::Provider(_)));
    assert_eq!(h.respondent_repo.count(), 0);
}

#[tokio::test]
async fn test_reverification_reuses_the_respondent_record() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let authorization_url = h
            .service
            .start(&h.instance_hash, "google", REDIRECT_URI)
            .await
            .unwrap();
        let state = extract_state(&authorization_url);
        h.service.callback("auth-code", &state).await.unwrap();

        let respondent = h
            .respondents
            .get_by_username(
                h.instance_id,
                "bob@acme.com",
                Some(RespondentOrigin::OauthVerified),
            )
            .await
            .unwrap();
        ids.push(respondent.id);
    }

    assert_eq!(ids[0], ids[1]);
    assert_eq!(h.respondent_repo.count(), 1);
}

#[tokio::test]
async fn test_concurrent_handshakes_do_not_clobber_each_other() {
    let h = harness(StaticProvider::new("bob@acme.com", "Bob", "Builder"), None).await;

    // Two handshakes in flight at once, each keyed by its own state.
    let url_a = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();
    let url_b = h
        .service
        .start(&h.instance_hash, "google", REDIRECT_URI)
        .await
        .unwrap();

    let state_a = extract_state(&url_a);
    let state_b = extract_state(&url_b);
    assert_ne!(state_a, state_b);

    assert!(h.service.callback("code-b", &state_b).await.is_ok());
    assert!(h.service.callback("code-a", &state_a).await.is_ok());
}
