use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use gatehouse_api::app::services::SharedStore;
use gatehouse_api::config::ApiConfig;
use gatehouse_auth::SetField;
use gatehouse_infra::{FaultInjectingStore, InMemoryMembershipStore};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    admin_url: String,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        Self::spawn_with_store(jwt_secret, Arc::new(InMemoryMembershipStore::new())).await
    }

    async fn spawn_with_store(jwt_secret: &str, store: SharedStore) -> Self {
        // Build app (same routers as prod), but bind both to ephemeral ports.
        let app = gatehouse_api::app::build_app_with_store(&ApiConfig::new(jwt_secret), store)
            .expect("failed to build app");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let admin_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let admin_url = format!("http://{}", admin_listener.local_addr().unwrap());

        let public = tokio::spawn(async move {
            axum::serve(listener, app.public).await.unwrap();
        });
        let admin = tokio::spawn(async move {
            axum::serve(admin_listener, app.admin).await.unwrap();
        });

        Self {
            base_url,
            admin_url,
            handles: vec![public, admin],
        }
    }

    async fn post(&self, path: &str, token: Option<&str>, form: &[(&str, &str)]) -> reqwest::Response {
        let mut req = reqwest::Client::new()
            .post(format!("{}{}", self.base_url, path))
            .form(form);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    async fn create_admin(&self, username: &str, pswdhash: &str) {
        let res = reqwest::Client::new()
            .post(format!("{}/auth/createadmin", self.admin_url))
            .form(&[("username", username), ("pswdhash", pswdhash)])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    async fn admin_request(&self, method: reqwest::Method, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .request(method, format!("{}{}", self.admin_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, username: &str, pswdhash: &str) -> String {
        let res = self
            .post("/auth/login", None, &[("username", username), ("pswdhash", pswdhash)])
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["username"], username);
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

fn mint_jwt(jwt_secret: &str, sub: &str, lifetime: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": sub,
        "jti": "0190a2b4-0000-7000-8000-000000000000",
        "iat": (now - ChronoDuration::hours(1)).timestamp(),
        "exp": (now - ChronoDuration::hours(1) + lifetime).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn("test-secret").await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv
        .post("/auth/addtogroup", None, &[("groupname", "editors"), ("username", "alice")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "malformed_header");

    let res = reqwest::Client::new()
        .get(format!("{}/auth/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_whoami() {
    let srv = TestServer::spawn("test-secret").await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;

    let form = [("username", "alice"), ("pswdhash", "h1"), ("usergroup", "editors,viewers")];

    // Naming groups needs edit_group.
    let res = srv.post("/auth/add", None, &form).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.post("/auth/add", Some(&root), &form).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User alice added");

    let token = srv.login("alice", "h1").await;

    let res = reqwest::Client::new()
        .get(format!("{}/auth/whoami", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["groups"], json!(["editors", "viewers"]));
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_bad_login_is_rejected() {
    let srv = TestServer::spawn("test-secret").await;

    let form = [("username", "alice"), ("pswdhash", "h1")];
    assert_eq!(srv.post("/auth/add", None, &form).await.status(), StatusCode::OK);
    assert_eq!(srv.post("/auth/add", None, &form).await.status(), StatusCode::CONFLICT);

    let res = srv
        .post("/auth/login", None, &[("username", "alice"), ("pswdhash", "wrong")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.post("/auth/add", None, &[("pswdhash", "h1")]).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn super_group_cannot_be_joined_at_registration() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv
        .post("/auth/add", None, &[("username", "mallory"), ("pswdhash", "h"), ("usergroup", "admin")])
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post("/auth/login", None, &[("username", "mallory"), ("pswdhash", "h")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn self_registration_cannot_reach_a_privileged_group() {
    let srv = TestServer::spawn("test-secret").await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;

    srv.post("/auth/add", None, &[("username", "victim"), ("pswdhash", "hv")]).await;
    let res = srv
        .post("/auth/addrighttogroup", Some(&root), &[("groupname", "editors"), ("right", "edit_group")])
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post("/auth/add", None, &[("username", "mallory"), ("pswdhash", "hm"), ("usergroup", "editors")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = srv
        .post("/auth/login", None, &[("username", "mallory"), ("pswdhash", "hm")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Without groups the account exists but holds nothing.
    let res = srv.post("/auth/add", None, &[("username", "mallory"), ("pswdhash", "hm")]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let mallory = srv.login("mallory", "hm").await;

    let res = srv
        .post("/auth/addtogroup", Some(&mallory), &[("groupname", "admin"), ("username", "mallory")])
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.post("/auth/del", Some(&mallory), &[("username", "victim")]).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn createadmin_is_only_served_on_the_admin_listener() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv
        .post("/auth/createadmin", None, &[("username", "root"), ("pswdhash", "h0")])
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    srv.create_admin("root", "h0").await;
    let token = srv.login("root", "h0").await;

    let res = srv
        .post("/auth/addrighttogroup", Some(&token), &[("groupname", "editors"), ("right", "edit_group")])
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn group_rights_gate_group_administration() {
    let srv = TestServer::spawn("test-secret").await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;

    srv.post("/auth/add", None, &[("username", "alice"), ("pswdhash", "h1")]).await;
    srv.post("/auth/add", None, &[("username", "bob"), ("pswdhash", "h2")]).await;
    let alice = srv.login("alice", "h1").await;

    // Not yet an editor.
    let res = srv
        .post("/auth/addtogroup", Some(&alice), &[("groupname", "editors"), ("username", "bob")])
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    for (path, form) in [
        ("/auth/addrighttogroup", [("groupname", "editors"), ("right", "edit_group")]),
        ("/auth/addtogroup", [("groupname", "editors"), ("username", "alice")]),
    ] {
        assert_eq!(srv.post(path, Some(&root), &form).await.status(), StatusCode::OK);
    }

    // Same token, new membership: takes effect immediately.
    let res = srv
        .post("/auth/addtogroup", Some(&alice), &[("groupname", "editors"), ("username", "bob")])
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // edit_group does not imply delete_user.
    let res = srv.post("/auth/del", Some(&alice), &[("username", "bob")]).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post("/auth/rmfromgroup", Some(&root), &[("groupname", "editors"), ("username", "alice")])
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post("/auth/addtogroup", Some(&alice), &[("groupname", "editors"), ("username", "alice")])
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn adding_an_unknown_user_to_a_group_is_not_found() {
    let srv = TestServer::spawn("test-secret").await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;

    let res = srv
        .post("/auth/addtogroup", Some(&root), &[("groupname", "editors"), ("username", "ghost")])
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_user_token_is_rejected() {
    let srv = TestServer::spawn("test-secret").await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;

    srv.post("/auth/add", Some(&root), &[("username", "alice"), ("pswdhash", "h1"), ("usergroup", "editors")])
        .await;
    let alice = srv.login("alice", "h1").await;

    let res = srv.post("/auth/del", Some(&root), &[("username", "alice")]).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.post("/auth/del", Some(&root), &[("username", "alice")]).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = reqwest::Client::new()
        .get(format!("{}/auth/whoami", srv.base_url))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_principal");
}

#[tokio::test]
async fn forged_and_expired_tokens_are_rejected() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    srv.create_admin("root", "h0").await;

    let forged = mint_jwt("someone-else", "root", ChronoDuration::hours(24));
    let res = srv
        .post("/auth/addrighttogroup", Some(&forged), &[("groupname", "g"), ("right", "r")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_signature");

    let expired = mint_jwt(jwt_secret, "root", ChronoDuration::minutes(30));
    let res = srv
        .post("/auth/addrighttogroup", Some(&expired), &[("groupname", "g"), ("right", "r")])
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "token_expired");

    let valid = mint_jwt(jwt_secret, "root", ChronoDuration::hours(24));
    let res = srv
        .post("/auth/addrighttogroup", Some(&valid), &[("groupname", "g"), ("right", "r")])
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn explain_reports_missing_right() {
    let srv = TestServer::spawn("test-secret").await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;
    srv.post("/auth/add", Some(&root), &[("username", "alice"), ("pswdhash", "h1"), ("usergroup", "editors")])
        .await;
    let alice = srv.login("alice", "h1").await;

    let res = reqwest::Client::new()
        .get(format!("{}/auth/explain?right=delete_user", srv.base_url))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["granted"], false);
    assert_eq!(body["denial"], "missing_right");
    assert_eq!(body["principal"]["groups"], json!(["editors"]));
}

#[tokio::test]
async fn failed_removal_is_reconciled_from_the_admin_listener() {
    let store = Arc::new(FaultInjectingStore::new(InMemoryMembershipStore::new()));
    let srv = TestServer::spawn_with_store("test-secret", store.clone()).await;
    srv.create_admin("root", "h0").await;
    let root = srv.login("root", "h0").await;

    srv.post("/auth/add", None, &[("username", "alice"), ("pswdhash", "h1")]).await;
    srv.post("/auth/add", None, &[("username", "bob"), ("pswdhash", "h2")]).await;
    for (path, form) in [
        ("/auth/addrighttogroup", [("groupname", "editors"), ("right", "edit_group")]),
        ("/auth/addtogroup", [("groupname", "editors"), ("username", "alice")]),
    ] {
        assert_eq!(srv.post(path, Some(&root), &form).await.status(), StatusCode::OK);
    }
    let alice = srv.login("alice", "h1").await;

    store.fail_next_update(SetField::UserGroups);
    let res = srv
        .post("/auth/rmfromgroup", Some(&root), &[("groupname", "editors"), ("username", "alice")])
        .await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "partial_membership_update");

    // The user side still names the group, so the right is still granted.
    let membership = [("groupname", "editors"), ("username", "bob")];
    let res = srv.post("/auth/addtogroup", Some(&alice), &membership).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Not served publicly.
    let res = reqwest::get(format!("{}/auth/reconcile", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.admin_request(reqwest::Method::GET, "/auth/reconcile").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["repaired"], false);
    assert_eq!(
        body["edges"],
        json!([{ "principal": "alice", "group": "editors", "present_on": "user_only" }])
    );

    let res = srv.admin_request(reqwest::Method::POST, "/auth/reconcile").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["repaired"], true);

    let res = srv.post("/auth/addtogroup", Some(&alice), &membership).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.admin_request(reqwest::Method::GET, "/auth/reconcile").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn post_routes_reject_other_methods() {
    let srv = TestServer::spawn("test-secret").await;

    let res = reqwest::get(format!("{}/auth/login", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}
