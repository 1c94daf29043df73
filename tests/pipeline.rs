use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::from_fn;
use actix_web::web::Data;
use actix_web::{test, App};
use gatekeep::config::{CommonConfig, PathSet};
use gatekeep::server::audit::clock::ManualClock;
use gatekeep::server::authn::config::AuthnConfig;
use gatekeep::server::authn::jwt::JwtTokenGenerator;
use gatekeep::server::config::ServerConfig;
use gatekeep::server::db::Database;
use gatekeep::server::factory::ServerFactory;
use gatekeep::server::pipeline::audit_middleware;
use gatekeep::server::restful::{RestfulContext, RestfulServer};
use gatekeep::time::parse_time;
use gatekeep::types::identity::{IdentityContext, Role, Verification};
use gatekeep::types::resource::{AddressRecord, OrderRecord, ProductRecord, UserRecord};
use serde_json::Value;

struct Harness {
    ctx: Arc<RestfulContext>,
    clock: ManualClock,
    audit_dir: PathBuf,
    tokens: JwtTokenGenerator,
    _base: tempfile::TempDir,
}

impl Harness {
    fn new(start: &str) -> Self {
        let base = tempfile::tempdir().unwrap();
        let ps = PathSet::new(
            Some(base.path().join("config")),
            Some(base.path().join("data")),
        )
        .unwrap();
        let mut cfg = ServerConfig::default();
        cfg.complete(&ps).unwrap();
        let audit_dir = cfg.audit.dir_path.clone();

        let db = Database::new_test().unwrap();
        db.with_transaction(|tx| {
            for id in ["u1", "u2", "u3", "root"] {
                tx.create_user(&UserRecord {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                })?;
            }
            tx.create_order(&OrderRecord {
                id: String::from("o1"),
                buyer_id: String::from("u2"),
                seller_id: String::from("u3"),
                status: String::from("paid"),
            })?;
            tx.create_product(&ProductRecord {
                id: String::from("p1"),
                owner_id: String::from("u3"),
                name: String::from("Clay vase"),
            })?;
            for (id, user_id) in [("a2", "u2"), ("a3", "u3")] {
                tx.create_address(&AddressRecord {
                    id: id.to_string(),
                    user_id: user_id.to_string(),
                    line: format!("{id} Kiln Lane"),
                })?;
            }
            Ok(())
        })
        .unwrap();

        let clock = ManualClock::new(parse_time(start).unwrap());
        let factory = ServerFactory::with_parts(cfg, Arc::new(db), Arc::new(clock.clone()));
        let (ctx, worker) = factory.build_context().unwrap();
        worker.start();

        Self {
            ctx,
            clock,
            audit_dir,
            tokens: JwtTokenGenerator::new(&AuthnConfig::default_secret(), 3600),
            _base: base,
        }
    }

    fn bearer(&self, identity: &IdentityContext) -> (String, String) {
        let token = self.tokens.generate_token(identity).unwrap();
        (String::from("Authorization"), format!("Bearer {token}"))
    }

    fn general_log(&self) -> PathBuf {
        self.audit_dir.join("audit.log")
    }

    fn security_log(&self) -> PathBuf {
        self.audit_dir.join("security.log")
    }
}

macro_rules! init_app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($h.ctx.clone()))
                .wrap(from_fn(audit_middleware))
                .configure(RestfulServer::routes),
        )
        .await
    };
}

/// Waits for the writer task to flush `n` lines into `path`.
async fn wait_lines(path: &Path, n: usize) -> Vec<Value> {
    for _ in 0..200 {
        if let Ok(text) = fs::read_to_string(path) {
            let lines = text
                .lines()
                .map(|line| serde_json::from_str::<Value>(line).unwrap())
                .collect::<Vec<_>>();
            if lines.len() >= n {
                return lines;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} did not reach {n} lines", path.display());
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .collect()
}

fn customer_with_address(id: &str) -> IdentityContext {
    let mut identity = IdentityContext::new(id, Role::Customer);
    identity.has_address = true;
    identity
}

#[actix_web::test]
async fn test_order_access_denied() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let caller = customer_with_address("u1");
    let req = test::TestRequest::get()
        .uri("/api/resources/order/o1")
        .insert_header(h.bearer(&caller))
        .insert_header(("x-forwarded-for", "203.0.113.9"))
        .insert_header(("user-agent", "curl/8.4.0"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let request_id = resp
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RESOURCE_ACCESS_DENIED");
    // The caller learns nothing about the order
    assert!(!body["message"].as_str().unwrap().contains("o1"));

    let general = wait_lines(&h.general_log(), 1).await;
    assert_eq!(general.len(), 1);
    let record = &general[0];
    assert_eq!(record["request_id"], request_id.as_str());
    assert_eq!(record["ip"], "203.0.113.9");
    assert_eq!(record["status_code"], 403);
    assert_eq!(record["client"]["browser"], "curl");
    assert_eq!(record["auth"]["status"], "AUTHENTICATED");
    assert_eq!(record["auth"]["role"], "customer");
    assert_eq!(record["authorization"]["status"], "FORBIDDEN");
    assert_eq!(record["authorization"]["code"], "RESOURCE_ACCESS_DENIED");
    assert_eq!(
        record["security"],
        "Unauthorized order access attempt by user u1 on order o1"
    );

    let security = wait_lines(&h.security_log(), 1).await;
    assert_eq!(security.len(), 1);
    assert_eq!(security[0]["request_id"], request_id.as_str());
}

#[actix_web::test]
async fn test_order_party_reads_resolved_resource() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let seller = IdentityContext::new("u3", Role::Artisan);
    let req = test::TestRequest::get()
        .uri("/api/resources/orders/o1")
        .insert_header(h.bearer(&seller))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["type"], "order");
    assert_eq!(body["data"]["data"]["buyer_id"], "u2");

    let general = wait_lines(&h.general_log(), 1).await;
    assert_eq!(general[0]["authorization"]["status"], "AUTHORIZED");
    assert_eq!(general[0]["authorization"]["code"], "ACCESS_GRANTED");
    assert!(general[0].get("security").is_none());
    assert!(read_lines(&h.security_log()).is_empty());
}

#[actix_web::test]
async fn test_unverified_artisan_create() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let artisan = IdentityContext::new("u3", Role::Artisan);
    let req = test::TestRequest::post()
        .uri("/api/resources/product")
        .insert_header(h.bearer(&artisan))
        .set_payload(r#"{"name": "Glazed bowl"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "IDENTITY_VERIFICATION_REQUIRED");

    let general = wait_lines(&h.general_log(), 1).await;
    assert_eq!(
        general[0]["authorization"]["code"],
        "IDENTITY_VERIFICATION_REQUIRED"
    );

    let mut verified = artisan.clone();
    verified.verification = Verification {
        identity: true,
        ..Default::default()
    };
    let req = test::TestRequest::post()
        .uri("/api/resources/product")
        .insert_header(h.bearer(&verified))
        .set_payload(r#"{"name": "Glazed bowl"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["action"], "create");
    assert_eq!(body["data"]["type"], "product");
}

#[actix_web::test]
async fn test_path_traversal_blocked() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let admin = IdentityContext::new("root", Role::Admin);
    for uri in ["/api/resources/../etc/passwd", "/api/resources/../secrets"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(h.bearer(&admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "SECURITY_VIOLATION");
    }

    let general = wait_lines(&h.general_log(), 2).await;
    for record in general.iter() {
        assert_eq!(record["authorization"]["status"], "CLIENT_ERROR");
        assert_eq!(record["authorization"]["code"], "SECURITY_VIOLATION");
        assert_eq!(record["security"], "Blocked request: PATH_TRAVERSAL");
    }
    assert_eq!(wait_lines(&h.security_log(), 2).await.len(), 2);
}

#[actix_web::test]
async fn test_injection_blocked() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);
    let caller = IdentityContext::new("u1", Role::Customer);

    let req = test::TestRequest::get()
        .uri("/api/resources/product?q=%27%20OR%201%3D1")
        .insert_header(h.bearer(&caller))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);

    let req = test::TestRequest::put()
        .uri("/api/resources/address/a1")
        .insert_header(h.bearer(&caller))
        .set_payload(r#"{"user_id": {"$ne": null}}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);

    let security = wait_lines(&h.security_log(), 2).await;
    assert_eq!(security[0]["security"], "Blocked request: SQL_INJECTION_ATTEMPT");
    assert_eq!(
        security[1]["security"],
        "Blocked request: NOSQL_INJECTION_ATTEMPT"
    );
}

#[actix_web::test]
async fn test_scraping_flagged_not_blocked() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let caller = IdentityContext::new("u1", Role::Customer);
    let req = test::TestRequest::get()
        .uri("/api/resources/product?limit=150")
        .insert_header(h.bearer(&caller))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let general = wait_lines(&h.general_log(), 1).await;
    assert_eq!(
        general[0]["security"],
        "Suspicious request: POTENTIAL_DATA_SCRAPING"
    );
    assert_eq!(general[0]["authorization"]["status"], "AUTHORIZED");
    assert_eq!(wait_lines(&h.security_log(), 1).await.len(), 1);
}

#[actix_web::test]
async fn test_one_record_per_request() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let req = test::TestRequest::get().uri("/nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    // No credentials
    let req = test::TestRequest::get()
        .uri("/api/resources/product")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");

    // Rejected credentials count as none
    let req = test::TestRequest::get()
        .uri("/api/resources/product")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let general = wait_lines(&h.general_log(), 4).await;
    assert_eq!(general.len(), 4);

    assert_eq!(general[0]["url"], "/healthz");
    assert_eq!(general[0]["authorization"]["status"], "SUCCESS");
    assert_eq!(general[0]["authorization"]["code"], "PUBLIC_ACCESS");

    assert_eq!(general[1]["status_code"], 404);
    assert_eq!(general[1]["authorization"]["status"], "CLIENT_ERROR");

    for record in &general[2..] {
        assert_eq!(record["auth"]["status"], "UNAUTHENTICATED");
        assert_eq!(record["authorization"]["status"], "UNAUTHORIZED");
        assert_eq!(record["authorization"]["code"], "AUTHENTICATION_REQUIRED");
    }

    let ids = general
        .iter()
        .map(|r| r["request_id"].as_str().unwrap().to_string())
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(ids.len(), 4);
    assert!(read_lines(&h.security_log()).is_empty());

    // Human-readable companion is written ahead of later records
    let text = std::fs::read_to_string(h.audit_dir.join("audit.txt")).unwrap();
    let first = text.lines().next().unwrap();
    assert!(first.contains("/healthz"));
    assert!(!first.starts_with('{'));
}

#[actix_web::test]
async fn test_rotation_at_day_boundary() {
    let h = Harness::new("2024-03-20 23:59:30");
    let app = init_app!(h);

    let req = test::TestRequest::get().uri("/healthz").to_request();
    test::call_service(&app, req).await;
    wait_lines(&h.general_log(), 1).await;

    h.clock.advance(chrono::Duration::minutes(1));
    let req = test::TestRequest::get().uri("/healthz").to_request();
    test::call_service(&app, req).await;

    let archived = h.audit_dir.join("archive").join("audit-2024-03-20.log");
    let archived = wait_lines(&archived, 1).await;
    assert_eq!(archived.len(), 1);

    let active = wait_lines(&h.general_log(), 1).await;
    assert_eq!(active.len(), 1);
    assert!(active[0]["timestamp"]
        .as_str()
        .unwrap()
        .starts_with("2024-03-21T00:00:30"));
}

#[actix_web::test]
async fn test_admin_audit_search() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let caller = customer_with_address("u1");
    let req = test::TestRequest::get()
        .uri("/api/resources/order/o1")
        .insert_header(h.bearer(&caller))
        .to_request();
    test::call_service(&app, req).await;
    wait_lines(&h.security_log(), 1).await;

    // Not an admin: denied and flagged
    let req = test::TestRequest::get()
        .uri("/api/admin/audit?stream=security")
        .insert_header(h.bearer(&caller))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let general = wait_lines(&h.general_log(), 2).await;
    assert_eq!(
        general[1]["security"],
        "Suspicious request: UNAUTHORIZED_ADMIN_ACCESS"
    );

    let admin = IdentityContext::new("root", Role::Admin);
    let req = test::TestRequest::get()
        .uri("/api/admin/audit?stream=security&search=ORDER%20ACCESS")
        .insert_header(h.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["url"], "/api/resources/order/o1");

    let req = test::TestRequest::get()
        .uri("/api/admin/audit?limit=abc")
        .insert_header(h.bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(
        body["message"],
        "Bad request: invalid audit query parameters"
    );

    let general = wait_lines(&h.general_log(), 4).await;
    assert_eq!(general[3]["status_code"], 400);
    assert!(general[3]["error"]
        .as_str()
        .unwrap()
        .starts_with("parse audit query"));
}

#[actix_web::test]
async fn test_artisan_reads_only_own_address() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let artisan = IdentityContext::new("u3", Role::Artisan);
    let req = test::TestRequest::get()
        .uri("/api/resources/address/a2")
        .insert_header(h.bearer(&artisan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "RESOURCE_ACCESS_DENIED");
    assert!(body.get("data").is_none());

    let req = test::TestRequest::get()
        .uri("/api/resources/address/a3")
        .insert_header(h.bearer(&artisan))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["data"]["user_id"], "u3");

    let general = wait_lines(&h.general_log(), 2).await;
    assert_eq!(general[0]["authorization"]["status"], "FORBIDDEN");
    assert_eq!(general[0]["authorization"]["code"], "RESOURCE_ACCESS_DENIED");
    assert_eq!(
        general[0]["security"],
        "Unauthorized address access attempt by user u3 on address a2"
    );
    assert!(general[1].get("security").is_none());
}

#[actix_web::test]
async fn test_ownership_denial_after_suspicious_flag() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let caller = customer_with_address("u1");
    let req = test::TestRequest::get()
        .uri("/api/resources/order/o1?limit=500")
        .insert_header(h.bearer(&caller))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    let security = wait_lines(&h.security_log(), 1).await;
    assert_eq!(security.len(), 1);
    assert_eq!(
        security[0]["security"],
        "Suspicious request: POTENTIAL_DATA_SCRAPING; \
         Unauthorized order access attempt by user u1 on order o1"
    );
    assert_eq!(security[0]["authorization"]["code"], "RESOURCE_ACCESS_DENIED");
}

#[actix_web::test]
async fn test_healthz_screened() {
    let h = Harness::new("2024-03-20 10:00:00");
    let app = init_app!(h);

    let req = test::TestRequest::get()
        .uri("/healthz?q=%27%20or%201%3D1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "SECURITY_VIOLATION");

    let security = wait_lines(&h.security_log(), 1).await;
    assert_eq!(
        security[0]["security"],
        "Blocked request: SQL_INJECTION_ATTEMPT"
    );

    // The writer is draining, so the service reports ready
    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
