use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use aula_api::app::services::AppServices;
use aula_api::config::AppConfig;
use aula_auth::{
    HttpMethod, JwtClaims, NewUser, Role, RoleName, RoleSummary, Rule, TokenKind, UserAccount, hash_password,
};
use aula_core::UserId;
use aula_infra::{CollectionCache, InMemoryDocumentStore, RuleSource, RuleStoreError, StoreError};
use aula_messaging::{Message, NewMessage};

const JWT_SECRET: &str = "test-secret";
const PASSWORD: &str = "correct-horse";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::for_secret(JWT_SECRET), |services| services).await
    }

    /// Same router as prod, over in-memory storage, bound to an ephemeral port.
    async fn spawn_with(config: AppConfig, wire: impl FnOnce(AppServices) -> AppServices) -> Self {
        let services = Arc::new(wire(AppServices::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(CollectionCache::default()),
            &config,
        )));
        let app = aula_api::app::build_app_with(services.clone(), &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn role(&self, name: &str, rules: Vec<Rule>) -> Role {
        let mut role = Role::new(RoleName::new(name.to_string()), "");
        role.rules = rules;
        self.services.repos.roles.save(&role).await.unwrap();
        role
    }

    async fn user(&self, username: &str, roles: &[&Role]) -> UserAccount {
        let input = NewUser {
            email: format!("{username}@aula.dev"),
            username: username.to_string(),
            name: username.to_string(),
            password: PASSWORD.to_string(),
        };
        let mut user = UserAccount::new(input, hash_password(PASSWORD).unwrap(), Utc::now());
        for role in roles {
            user.assign_role(role.summary());
        }
        self.services.repos.users.save(&user).await.unwrap();
        user
    }

    async fn message(&self, from: &UserAccount, to: &UserAccount, subject: &str) -> Message {
        let message = Message::send(
            NewMessage {
                from: from.email.clone(),
                to: to.email.clone(),
                subject: subject.to_string(),
                body: "the body".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        self.services.repos.messages.save(&message).await.unwrap();
        message
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, email: &str) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        email: email.to_string(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
        kind: TokenKind::Access,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn token_for(user: &UserAccount) -> String {
    mint_jwt(user.id, &user.email)
}

/// JSON body without a Content-Length, sent with chunked transfer encoding.
fn chunked_json(value: &Value) -> reqwest::Body {
    let bytes = serde_json::to_vec(value).unwrap();
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = bytes.chunks(16).map(|c| Ok(c.to_vec())).collect();
    reqwest::Body::wrap_stream(futures::stream::iter(chunks))
}

fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|c| {
        let value = c.strip_prefix(name)?.strip_prefix('=')?;
        Some(value.split(';').next().unwrap_or_default().to_string())
    })
}

/// Rule source whose backing store is down.
struct UnavailableRules;

#[axum::async_trait]
impl RuleSource for UnavailableRules {
    async fn user_roles(&self, _user_id: UserId) -> Result<Vec<RoleSummary>, RuleStoreError> {
        Err(RuleStoreError::Repository(
            StoreError::Backend("connection refused".to_string()).into(),
        ))
    }

    async fn rules_for_role(&self, _name: &RoleName) -> Result<Vec<Rule>, RuleStoreError> {
        Ok(Vec::new())
    }
}

fn keys(body: &Value) -> Vec<&str> {
    let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_for_unknown_user_is_rejected_before_the_handler() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(UserId::new(), "ghost@aula.dev"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn signup_login_and_cookie_credential() {
    let srv = TestServer::spawn().await;
    let mut student = Role::new(RoleName::new("student"), "default");
    student.is_default = true;
    srv.services.repos.roles.save(&student).await.unwrap();

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/auth/signup"))
        .json(&json!({
            "email": "Ana@Aula.dev",
            "username": "ana",
            "name": "Ana",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["message"], "USERCREATED");

    let res = client
        .post(srv.url("/auth/signup"))
        .json(&json!({ "email": "ana@aula.dev", "username": "ana2", "name": "A", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "ana@aula.dev", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "ana@aula.dev", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("bearer_token="));
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/whoami"))
        .header(reqwest::header::COOKIE, format!("bearer_token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["email"], "ana@aula.dev");
    assert_eq!(body["roles"], json!(["student"]));
}

#[tokio::test]
async fn response_body_is_filtered_by_matching_rule() {
    let srv = TestServer::spawn().await;
    let reader = srv
        .role(
            "reader",
            vec![Rule::new(HttpMethod::Get, "/messages/:id")
                .with_parameters(["id"])
                .with_body_out(["id", "subject"])],
        )
        .await;
    let ana = srv.user("ana", &[&reader]).await;
    let bob = srv.user("bob", &[]).await;
    let message = srv.message(&bob, &ana, "hi").await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url(&format!("/messages/{}", message.id)))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(keys(&body), ["id", "subject"]);
    assert_eq!(body["subject"], "hi");

    // Bob holds no rules at all: full document.
    let res = client
        .get(srv.url(&format!("/messages/{}", message.id)))
        .bearer_auth(token_for(&bob))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "MESSAGEGOT");
    assert_eq!(body["body"], "the body");
}

#[tokio::test]
async fn method_without_rule_passes_through_unfiltered() {
    let srv = TestServer::spawn().await;
    let reader = srv
        .role(
            "reader",
            vec![
                Rule::new(HttpMethod::Get, "/messages/:id")
                    .with_parameters(["id"])
                    .with_body_out(["id"]),
                Rule::new(HttpMethod::Put, "/messages/:id/status")
                    .with_parameters(["id"])
                    .with_body_in(["nothing"]),
            ],
        )
        .await;
    let ana = srv.user("ana", &[&reader]).await;
    srv.user("bob", &[]).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/messages"))
        .bearer_auth(token_for(&ana))
        .json(&json!({ "to": "bob@aula.dev", "subject": "hello", "body": "full text" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "MESSAGECREATED");

    let id = body["id"].as_str().unwrap().parse().unwrap();
    let stored = srv.services.repos.messages.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.body, "full text");
    assert_eq!(stored.from, "ana@aula.dev");
}

#[tokio::test]
async fn request_body_is_filtered_before_the_handler() {
    let srv = TestServer::spawn().await;
    let sender = srv
        .role(
            "sender",
            vec![Rule::new(HttpMethod::Post, "/messages").with_body_in(["to", "subject"])],
        )
        .await;
    let ana = srv.user("ana", &[&sender]).await;
    srv.user("bob", &[]).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/messages"))
        .bearer_auth(token_for(&ana))
        .json(&json!({ "to": "bob@aula.dev", "subject": "hello", "body": "dropped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();

    let id = body["id"].as_str().unwrap().parse().unwrap();
    let stored = srv.services.repos.messages.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.subject, "hello");
    assert_eq!(stored.body, "");
}

#[tokio::test]
async fn first_matching_rule_wins() {
    let srv = TestServer::spawn().await;
    let first = srv
        .role(
            "first",
            vec![Rule::new(HttpMethod::Get, "/messages/:id")
                .with_parameters(["id"])
                .with_body_out(["subject"])],
        )
        .await;
    let second = srv
        .role(
            "second",
            vec![Rule::new(HttpMethod::Get, "/messages/{id}")
                .with_parameters(["id"])
                .with_body_out(["id"])],
        )
        .await;
    let ana = srv.user("ana", &[&first, &second]).await;
    let message = srv.message(&ana, &ana, "note to self").await;

    let client = reqwest::Client::new();
    let body: Value = client
        .get(srv.url(&format!("/messages/{}", message.id)))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "subject": "note to self" }));
}

#[tokio::test]
async fn query_string_is_filtered_before_the_handler() {
    let srv = TestServer::spawn().await;
    let mailbox = srv
        .role(
            "mailbox",
            vec![Rule::new(HttpMethod::Get, "/messages").with_queries(["email"])],
        )
        .await;
    let ana = srv.user("ana", &[&mailbox]).await;
    let bob = srv.user("bob", &[]).await;
    srv.message(&bob, &ana, "unread one").await;

    let client = reqwest::Client::new();
    let url = srv.url("/messages?email=ana%40aula.dev&filter=read");

    // Without the rule the read filter applies and nothing matches.
    let body: Value = client
        .get(&url)
        .bearer_auth(token_for(&bob))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["messagesFound"], json!([]));

    // With it, `filter` never reaches the handler.
    let body: Value = client
        .get(&url)
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["messagesFound"].as_array().unwrap().len(), 1);

    // Stripping the required key leaves the handler without it.
    let narrow = srv
        .role(
            "narrow",
            vec![Rule::new(HttpMethod::Get, "/messages").with_queries(["filter"])],
        )
        .await;
    let carl = srv.user("carl", &[&narrow]).await;
    let res = client
        .get(&url)
        .bearer_auth(token_for(&carl))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "EMAILREQUIRED");
}

#[tokio::test]
async fn disallowed_path_parameter_is_hidden_from_the_handler() {
    let srv = TestServer::spawn().await;
    let ana = srv.user("ana", &[]).await;
    let message = srv.message(&ana, &ana, "pinned").await;

    let literal = srv
        .role(
            "literal",
            vec![Rule::new(HttpMethod::Get, format!("/messages/{}", message.id)).with_parameters(["other"])],
        )
        .await;
    let bob = srv.user("bob", &[&literal]).await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url(&format!("/messages/{}", message.id)))
        .bearer_auth(token_for(&bob))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_path_parameters");
}

#[tokio::test]
async fn role_administration_requires_admin() {
    let srv = TestServer::spawn().await;
    let admin_role = srv.role(RoleName::ADMIN, vec![]).await;
    let admin = srv.user("root", &[&admin_role]).await;
    let ana = srv.user("ana", &[]).await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/authorization/roles"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/authorization/roles"))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "name": "editor", "description": "edits" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/authorization/roles"))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "name": "editor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "ROLEALREADYEXISTS");

    let body: Value = client
        .get(srv.url("/authorization/roles"))
        .bearer_auth(token_for(&admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = body["rolesFound"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["admin", "editor"]);
}

#[tokio::test]
async fn rule_changes_apply_without_new_token() {
    let srv = TestServer::spawn().await;
    let admin_role = srv.role(RoleName::ADMIN, vec![]).await;
    let admin = srv.user("root", &[&admin_role]).await;
    let ana = srv.user("ana", &[]).await;
    let message = srv.message(&admin, &ana, "welcome").await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/authorization/roles"))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "name": "viewer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .put(srv.url(&format!("/authorization/users/{}/roles/viewer", ana.id)))
        .bearer_auth(token_for(&admin))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url("/authorization/roles/viewer/rules"))
        .bearer_auth(token_for(&admin))
        .json(&json!({ "rules": [{
            "method": "GET",
            "route": "/messages/:id",
            "dataIn": { "parameters": ["id"] },
            "dataOut": { "body": ["subject"] }
        }]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = client
        .get(srv.url(&format!("/messages/{}", message.id)))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "subject": "welcome" }));

    let res = client
        .delete(srv.url(&format!("/authorization/users/{}/roles/viewer", ana.id)))
        .bearer_auth(token_for(&admin))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = client
        .get(srv.url(&format!("/messages/{}", message.id)))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["body"], "the body");
}

#[tokio::test]
async fn catalog_changes_require_publisher() {
    let srv = TestServer::spawn().await;
    let publisher = srv.role(RoleName::PUBLISHER, vec![]).await;
    let pat = srv.user("pat", &[&publisher]).await;
    let ana = srv.user("ana", &[]).await;

    let course = json!({
        "title": "Rust 101",
        "description": "ownership and borrowing",
        "publisher": "pat",
        "price": 10.0,
        "language": "en",
        "tags": ["rust"],
    });

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/courses"))
        .bearer_auth(token_for(&ana))
        .json(&course)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/courses"))
        .bearer_auth(token_for(&pat))
        .json(&course)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = client
        .get(srv.url("/courses?keywords=rust"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "COURSESGOT");
    assert_eq!(body["coursesFound"][0]["title"], "Rust 101");

    let res = client
        .post(srv.url("/courses/Rust%20101/deactivate"))
        .bearer_auth(token_for(&pat))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/courses?keywords=rust"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chunked_request_body_is_still_filtered() {
    let srv = TestServer::spawn().await;
    let tagger = srv
        .role("tagger", vec![Rule::new(HttpMethod::Post, "/tags").with_body_in(["name"])])
        .await;
    let ana = srv.user("ana", &[&tagger]).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/tags"))
        .bearer_auth(token_for(&ana))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(chunked_json(&json!({ "name": "t2", "username": "ana" })))
        .send()
        .await
        .unwrap();

    // `username` was stripped, so the handler cannot deserialize its input.
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(srv.services.repos.tags.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_restricted_body_is_refused() {
    let mut config = AppConfig::for_secret(JWT_SECRET);
    config.max_body_bytes = 256;
    let srv = TestServer::spawn_with(config, |services| services).await;
    let tagger = srv
        .role("tagger", vec![Rule::new(HttpMethod::Post, "/tags").with_body_in(["name"])])
        .await;
    let ana = srv.user("ana", &[&tagger]).await;
    let body = json!({ "name": "x".repeat(600), "username": "ana" });

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/tags"))
        .bearer_auth(token_for(&ana))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(chunked_json(&body))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let payload: Value = res.json().await.unwrap();
    assert_eq!(payload["error"], "payload_too_large");

    let res = client
        .post(srv.url("/tags"))
        .bearer_auth(token_for(&ana))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(srv.services.repos.tags.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn plus_in_path_value_still_matches_its_rule() {
    let srv = TestServer::spawn().await;
    let publisher = srv.role(RoleName::PUBLISHER, vec![]).await;
    let terse = srv
        .role(
            "terse",
            vec![Rule::new(HttpMethod::Patch, "/courses/:title")
                .with_parameters(["title"])
                .with_body_out(["statusCode", "message"])],
        )
        .await;
    let pat = srv.user("pat", &[&publisher, &terse]).await;

    let client = reqwest::Client::new();
    for title in ["Rust", "C++"] {
        let res = client
            .post(srv.url("/courses"))
            .bearer_auth(token_for(&pat))
            .json(&json!({ "title": title, "publisher": "pat", "price": 5.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let body: Value = client
            .patch(srv.url(&format!("/courses/{title}")))
            .bearer_auth(token_for(&pat))
            .json(&json!({ "language": "es" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(keys(&body), ["message", "statusCode"], "title {title}");
    }

    let stored = srv.services.repos.courses.by_title("C++").await.unwrap().unwrap();
    assert_eq!(stored.language, "es");
}

#[tokio::test]
async fn rule_lookup_failure_aborts_before_the_handler() {
    let srv = TestServer::spawn_with(AppConfig::for_secret(JWT_SECRET), |mut services| {
        services.rules = Arc::new(UnavailableRules);
        services
    })
    .await;
    let ana = srv.user("ana", &[]).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/tags"))
        .bearer_auth(token_for(&ana))
        .json(&json!({ "name": "urgent", "username": "ana" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rule_lookup_failed");
    assert!(srv.services.repos.tags.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn refresh_cookie_renews_the_session() {
    let srv = TestServer::spawn().await;
    let ana = srv.user("ana", &[]).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ana.email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);
    let refresh = cookie_value(&cookies, "refresh_token").unwrap();
    assert!(cookie_value(&cookies, "bearer_token").is_some());

    // A refresh token is not a bearer credential.
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.put(srv.url("/auth/session")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .put(srv.url("/auth/session"))
        .header(reqwest::header::COOKIE, format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "SESSIONREFRESHED");
    let token = body["token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/auth/logout")).send().await.unwrap();
    let cleared = set_cookies(&res);
    assert_eq!(cookie_value(&cleared, "refresh_token").as_deref(), Some(""));
    assert_eq!(cookie_value(&cleared, "bearer_token").as_deref(), Some(""));
}

#[tokio::test]
async fn sections_group_catalog_content() {
    let srv = TestServer::spawn().await;
    let publisher = srv.role(RoleName::PUBLISHER, vec![]).await;
    let pat = srv.user("pat", &[&publisher]).await;
    let browse = srv
        .role(
            "browse",
            vec![Rule::new(HttpMethod::Get, "/sections/:name")
                .with_parameters(["name"])
                .with_body_out(["name", "content"])],
        )
        .await;
    let ana = srv.user("ana", &[&browse]).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/sections"))
        .bearer_auth(token_for(&ana))
        .json(&json!({ "name": "Backend" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/sections"))
        .bearer_auth(token_for(&pat))
        .json(&json!({ "name": "Backend", "description": "server side", "tags": ["rust"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/sections"))
        .bearer_auth(token_for(&pat))
        .json(&json!({ "name": "Backend" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "SECTIONALREADYEXISTS");

    // Ebooks must exist before they can be attached.
    let ebook = json!({ "kind": "ebook", "title": "Zero to Prod", "url": "https://books.dev/z2p" });
    let res = client
        .put(srv.url("/sections/Backend/content"))
        .bearer_auth(token_for(&pat))
        .json(&ebook)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/ebooks"))
        .bearer_auth(token_for(&pat))
        .json(&json!({
            "title": "Zero to Prod",
            "author": "Luca",
            "url": "https://books.dev/z2p",
            "format": "pdf",
            "price": 30.0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .put(srv.url("/sections/Backend/content"))
        .bearer_auth(token_for(&pat))
        .json(&ebook)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "MEDIAOREBOOKADDEDSUCCESSFULLY");

    let res = client
        .post(srv.url("/sections/Backend/subsections"))
        .bearer_auth(token_for(&pat))
        .json(&json!({ "name": "Axum" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .put(srv.url("/sections/Backend/subsections/Axum/content"))
        .bearer_auth(token_for(&pat))
        .json(&json!({ "kind": "media", "title": "Routing", "url": "https://media.dev/routing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = client
        .get(srv.url("/sections/Backend"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(keys(&body), ["content", "name"]);
    assert_eq!(body["content"][0]["url"], "https://books.dev/z2p");

    let body: Value = client
        .get(srv.url("/sections?keywords=server&tags=rust"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sectionsFound"][0]["subsections"][0]["content"][0]["title"], "Routing");

    let res = client
        .post(srv.url("/sections/Backend/subsections/Axum/deactivate"))
        .bearer_auth(token_for(&pat))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = client
        .get(srv.url("/sections/Backend/subsections"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["subsectionsFound"], json!([]));

    let res = client
        .post(srv.url("/sections/Backend/deactivate"))
        .bearer_auth(token_for(&pat))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/sections"))
        .bearer_auth(token_for(&ana))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
