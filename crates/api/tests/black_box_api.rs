use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use loyalty_auth::{Caller, Role, SessionClaims};
use loyalty_core::UserId;
use loyalty_infra::{Clock, Config, FixedClock, InMemoryLoyaltyStore, run_seed};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    clock: Arc<FixedClock>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = Config::from_lookup(|key| {
            let v = match key {
                "JWT_SECRET" => JWT_SECRET,
                "SEED_STORE_NAMES" => "Centro,Norte",
                "SEED_ADMIN_EMAIL" => "admin@x.com",
                "SEED_ADMIN_PASSWORD" => "right",
                "SEED_MANAGER_STORE" => "Norte",
                "SEED_MANAGER_EMAIL" => "gerente@x.com",
                "SEED_MANAGER_PASSWORD" => "right",
                _ => return None,
            };
            Some(v.to_string())
        })
        .unwrap();

        let store = Arc::new(InMemoryLoyaltyStore::new());
        run_seed(store.as_ref(), &config.seed, config.default_visit_threshold)
            .await
            .unwrap();

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()));
        let services = loyalty_api::app::services::build_services(&config, store, clock.clone());

        // Same router as prod, bound to an ephemeral port.
        let app = loyalty_api::app::build_app(services);
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
            clock,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn store_id(&self, admin: &str, name: &str) -> i64 {
        let (_, stores) = self.get(admin, "/admin/stores").await;
        stores["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == name)
            .and_then(|s| s["id"].as_i64())
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn login_issues_a_token_carrying_the_role() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "admin@x.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = srv.login("admin@x.com", "right").await;
    let (status, me) = srv.get(&token, "/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "ADMIN");
    assert_eq!(me["email"], "admin@x.com");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/clients")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Claims valid at the server's clock: only the signing secret decides.
    let now = srv.clock.now();
    let caller = Caller::new(UserId::new(1), Role::Admin, None, false).unwrap();
    let claims = SessionClaims::for_caller(&caller, now, now + ChronoDuration::minutes(10));
    let sign = |secret: &[u8]| {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
            .expect("failed to encode jwt")
    };

    let (status, _) = srv.get(&sign(JWT_SECRET.as_bytes()), "/clients").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.get(&sign(b"another-secret"), "/clients").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_expire_with_the_clock() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin@x.com", "right").await;

    srv.clock.advance(ChronoDuration::hours(9));
    let (status, _) = srv.get(&token, "/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_are_forbidden_for_managers() {
    let srv = TestServer::spawn().await;
    let manager = srv.login("gerente@x.com", "right").await;

    let (status, _) = srv.get(&manager, "/admin/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rejected before the body is looked at.
    let (status, _) = srv.post(&manager, "/admin/users", json!({ "bogus": true })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.post(&manager, "/admin/stores", json!({ "name": "Sul" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn scope_locked_manager_only_sees_own_store() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@x.com", "right").await;
    let manager = srv.login("gerente@x.com", "right").await;
    let centro = srv.store_id(&admin, "Centro").await;
    let norte = srv.store_id(&admin, "Norte").await;

    let (status, _) = srv
        .post(&admin, "/clients", json!({ "name": "Ana", "cpf": "111", "store_id": centro }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, created) = srv.post(&manager, "/clients", json!({ "name": "Bia", "cpf": "222" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["store_id"], norte);

    let (_, mine) = srv.get(&manager, "/clients").await;
    assert_eq!(mine["total"], 1);
    assert_eq!(mine["items"][0]["cpf"], "222");

    let (_, all) = srv.get(&admin, "/clients?page=1&per_page=10").await;
    assert_eq!(all["total"], 2);

    // Tax-id lookup crosses stores.
    let (_, found) = srv.get(&manager, "/clients?cpf=111").await;
    assert_eq!(found["items"][0]["name"], "Ana");

    // Registering into another store is refused.
    let (status, _) = srv
        .post(&manager, "/clients", json!({ "name": "Cris", "cpf": "333", "store_id": centro }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_tax_id_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@x.com", "right").await;

    let (status, _) = srv.post(&admin, "/clients", json!({ "name": "Ana", "cpf": "123" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = srv.post(&admin, "/clients", json!({ "name": "Outra", "cpf": "123" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "duplicate_tax_id");

    let (status, body) = srv
        .post(&admin, "/clients", json!({ "name": "Bad", "cpf": "9", "birthday": "soon" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_birthday");
}

#[tokio::test]
async fn nine_visits_are_not_enough_ten_are() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@x.com", "right").await;
    let centro = srv.store_id(&admin, "Centro").await;

    let (_, client) = srv
        .post(&admin, "/clients", json!({ "name": "Ana", "cpf": "555", "store_id": centro }))
        .await;
    for n in 1..=9 {
        let (status, visit) = srv.post(&admin, "/visits", json!({ "cpf": "555" })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(visit["visits_count"], n);
    }

    let (status, body) = srv.post(&admin, "/redemptions", json!({ "cpf": "555", "gift_name": "Caneca" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "not_eligible");
    assert_eq!(body["visits_count"], 9);
    assert_eq!(body["threshold"], 10);

    let (_, visit) = srv.post(&admin, "/visits", json!({ "client_id": client["id"] })).await;
    assert_eq!(visit["visits_count"], 10);
    assert_eq!(visit["eligible"], true);

    let (status, redemption) = srv.post(&admin, "/redemptions", json!({ "cpf": "555", "gift_name": "Caneca" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(redemption["gift_name"], "Caneca");
    assert!(redemption["redemption_id"].as_i64().is_some());
    assert!(redemption["when"].is_string());

    let (_, visit) = srv.post(&admin, "/visits", json!({ "cpf": "555" })).await;
    assert_eq!(visit["visits_count"], 1);

    let (_, kpis) = srv.get(&admin, "/dashboard/kpis").await;
    assert_eq!(kpis["redemptions_last_30_days"], 1);
    assert_eq!(kpis["visits_last_30_days"], 1);
    assert_eq!(kpis["total_clients"], 1);

    let (status, body) = srv.post(&admin, "/redemptions", json!({ "cpf": "nobody" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn birthdays_follow_the_current_month() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@x.com", "right").await;

    for (name, cpf, birthday) in [("Zé", "1", "1990-05-20"), ("Ana", "2", "02/05/1985"), ("Bia", "3", "1990-06-01")] {
        let (status, _) = srv
            .post(&admin, "/clients", json!({ "name": name, "cpf": cpf, "birthday": birthday }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = srv.get(&admin, "/dashboard/birthdays").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["items"].as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ana", "Zé"]);
}
