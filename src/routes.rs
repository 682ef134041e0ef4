use crate::{
    api::{attendance, leave, payroll, quick_setup, settings},
    auth::middleware::auth_middleware,
    config::Config,
    error::HrError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, get, middleware::from_fn, web};
use serde_json::json;
use std::sync::Arc;

/// Liveness probe, outside the protected scope.
#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
        let cfg: GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed bodies and queries surface as validation failures
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| HrError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| HrError::validation(err.to_string()).into()),
    );

    cfg.service(health);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::list_attendance))
                            .route(web::post().to(attendance::attendance_action)),
                    )
                    .service(web::resource("/checkin").route(web::post().to(attendance::check_in)))
                    .service(web::resource("/checkout").route(web::post().to(attendance::check_out)))
                    // /attendance/presence-check
                    .service(
                        web::resource("/presence-check")
                            .route(web::get().to(attendance::presence_status))
                            .route(web::post().to(attendance::confirm_presence)),
                    )
                    // /attendance/settings
                    .service(
                        web::resource("/settings")
                            .route(web::get().to(settings::get_settings))
                            .route(web::post().to(settings::save_settings)),
                    )
                    .service(
                        web::resource("/settings/status").route(web::post().to(settings::change_status)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("/compute").route(web::post().to(payroll::compute))),
            )
            .service(
                web::scope("/leave")
                    .service(web::resource("/accrual").route(web::post().to(leave::accrual)))
                    .service(
                        web::resource("/approval-route").route(web::post().to(leave::approval_route)),
                    ),
            )
            .service(
                web::scope("/quick-setup")
                    .service(web::resource("/reduce").route(web::post().to(quick_setup::reduce)))
                    .service(web::resource("/commit").route(web::post().to(quick_setup::commit))),
            )
            .service(web::resource("/rbac/roles").route(web::get().to(settings::list_roles))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::policy::WorkspacePolicy;
    use crate::state::AppState;
    use crate::store::{HrStore, MemoryStore};
    use crate::utils::clock::FixedClock;
    use crate::utils::presence_tracker::PresenceTracker;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use serde_json::Value;

    struct Harness {
        state: web::Data<AppState>,
        clock: Arc<FixedClock>,
        store: Arc<MemoryStore>,
    }

    /// 2026-03-02 is a Monday; times are KST.
    fn kst(h: u32, m: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 2, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn harness(now: DateTime<Utc>) -> Harness {
        let clock = Arc::new(FixedClock::new(now));
        let store = Arc::new(MemoryStore::new());
        let state = web::Data::new(AppState::new(
            store.clone(),
            PresenceTracker::new(std::time::Duration::from_secs(3600)),
            clock.clone(),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        ));
        Harness {
            state,
            clock,
            store,
        }
    }

    macro_rules! app {
        ($h:expr) => {
            test::init_service(
                App::new()
                    .app_data($h.state.clone())
                    .configure(|cfg| configure(cfg, Config::default())),
            )
            .await
        };
    }

    fn as_role(req: TestRequest, role: &str, ip: &str) -> TestRequest {
        req.peer_addr(format!("{ip}:40000").parse().unwrap())
            .insert_header(("x-user-id", "u1"))
            .insert_header(("x-workspace-id", "ws"))
            .insert_header(("x-user-role", role))
    }

    fn employee(req: TestRequest) -> TestRequest {
        as_role(req, "employee", "10.0.0.1")
    }

    fn hr(req: TestRequest) -> TestRequest {
        as_role(req, "hr_manager", "10.0.0.1")
    }

    async fn seed_policy(h: &Harness, edit: impl FnOnce(&mut WorkspacePolicy)) {
        let mut policy = WorkspacePolicy::default();
        edit(&mut policy);
        h.store.save_policy("ws", &policy).await.unwrap();
    }

    #[actix_web::test]
    async fn health_is_public_and_api_needs_identity() {
        let h = harness(kst(9, 0));
        let app = app!(h);

        let resp = test::call_service(
            &app,
            TestRequest::get().uri("/health").peer_addr("10.0.0.1:1".parse().unwrap()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/attendance")
                .peer_addr("10.0.0.1:1".parse().unwrap())
                .insert_header(("x-user-id", "u1"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn office_check_in_respects_allow_list() {
        let h = harness(kst(9, 5));
        seed_policy(&h, |p| {
            p.work_settings.office_ip_whitelist.insert("10.0.0.1".into());
        })
        .await;
        let app = app!(h);
        let body = serde_json::json!({"workLocation": "OFFICE"});

        let resp = test::call_service(
            &app,
            as_role(TestRequest::post(), "employee", "203.0.113.9")
                .uri("/api/attendance/checkin")
                .set_json(&body)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["code"], "POLICY_VIOLATION");

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/attendance/checkin").set_json(&body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["record"]["status"], "PRESENT");
        assert_eq!(json["record"]["date"], "2026-03-02");

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/attendance/checkin").set_json(&body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["code"], "ALREADY_CHECKED_IN");
    }

    #[actix_web::test]
    async fn late_arrival_and_lunch_adjusted_checkout() {
        let h = harness(kst(9, 11));
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance")
                .set_json(serde_json::json!({"action": "checkin", "workLocation": "OFFICE"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["record"]["status"], "LATE");

        h.clock.set(kst(18, 11));
        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance")
                .set_json(serde_json::json!({"action": "checkout"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["record"]["totalMinutes"], 480);

        let resp = test::call_service(
            &app,
            employee(TestRequest::get())
                .uri("/api/attendance?from=2026-03-01&to=2026-03-31")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["records"].as_array().unwrap().len(), 1);
        assert_eq!(json["summary"]["workedMinutes"], 480);
        assert_eq!(json["summary"]["lateCount"], 1);
        assert_eq!(json["summary"]["lateDeduction"], 10_000);
    }

    #[actix_web::test]
    async fn checkout_without_checkin_conflicts() {
        let h = harness(kst(18, 0));
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/attendance/checkout").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["code"], "NOT_CHECKED_IN");
    }

    #[actix_web::test]
    async fn remote_presence_cycle() {
        let h = harness(kst(9, 0));
        seed_policy(&h, |p| p.work_settings.presence_check_enabled = true).await;
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance/checkin")
                .set_json(serde_json::json!({"workLocation": "REMOTE"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["presence"]["state"]["state"], "ARMED");

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/attendance/presence-check").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let later = kst(9, 0) + Duration::minutes(90);
        h.clock.set(later);
        assert_eq!(h.state.presence.fire_due(later).await.len(), 1);

        let resp = test::call_service(
            &app,
            employee(TestRequest::get()).uri("/api/attendance/presence-check").to_request(),
        )
        .await;
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["state"]["state"], "PROMPTED");

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/attendance/presence-check").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["state"]["state"], "ARMED");
        assert_eq!(json["confirmations"], 1);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/attendance/checkout").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            employee(TestRequest::get()).uri("/api/attendance/presence-check").to_request(),
        )
        .await;
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["state"]["state"], "INACTIVE");
    }

    #[actix_web::test]
    async fn settings_edit_needs_permission_and_valid_numbers() {
        let h = harness(kst(10, 0));
        let app = app!(h);

        let mut policy = serde_json::to_value(WorkspacePolicy::default()).unwrap();
        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance/settings")
                .set_json(&policy)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        policy["payroll"]["overtimeMultipliers"]["overtime"] = serde_json::json!(0.5);
        let resp = test::call_service(
            &app,
            hr(TestRequest::post()).uri("/api/attendance/settings").set_json(&policy).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["code"], "VALIDATION_FAILURE");
        assert_eq!(json["details"]["errors"].as_array().unwrap().len(), 1);
        assert!(h.store.load_policy("ws").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn policy_approval_flow() {
        let h = harness(kst(10, 0));
        let app = app!(h);

        let status = |s: &str| serde_json::json!({ "status": s });

        let resp = test::call_service(
            &app,
            hr(TestRequest::post())
                .uri("/api/attendance/settings/status")
                .set_json(status("ACTIVE"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        for next in ["PENDING_APPROVAL", "ACTIVE"] {
            let resp = test::call_service(
                &app,
                hr(TestRequest::post())
                    .uri("/api/attendance/settings/status")
                    .set_json(status(next))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let stored = h.store.load_policy("ws").await.unwrap().unwrap();
        assert_eq!(stored.policy_status.as_ref(), "ACTIVE");

        let resp = test::call_service(
            &app,
            hr(TestRequest::post())
                .uri("/api/attendance/settings")
                .set_json(serde_json::to_value(&stored).unwrap())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["policyStatus"], "DRAFT");
    }

    #[actix_web::test]
    async fn disabling_presence_cancels_sessions() {
        let h = harness(kst(9, 0));
        seed_policy(&h, |p| p.work_settings.presence_check_enabled = true).await;
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance/checkin")
                .set_json(serde_json::json!({"workLocation": "REMOTE"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let policy = serde_json::to_value(WorkspacePolicy::default()).unwrap();
        let resp = test::call_service(
            &app,
            hr(TestRequest::post()).uri("/api/attendance/settings").set_json(&policy).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let later = kst(12, 0);
        assert!(h.state.presence.fire_due(later).await.is_empty());
    }

    #[actix_web::test]
    async fn policy_saves_retune_and_rearm_presence() {
        let h = harness(kst(9, 0));
        seed_policy(&h, |p| p.work_settings.presence_check_enabled = true).await;
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance/checkin")
                .set_json(serde_json::json!({"workLocation": "REMOTE"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        let record_id: uuid::Uuid = serde_json::from_value(json["record"]["id"].clone()).unwrap();

        let save = |policy: WorkspacePolicy| {
            hr(TestRequest::post())
                .uri("/api/attendance/settings")
                .set_json(serde_json::to_value(policy).unwrap())
                .to_request()
        };
        let mut policy = WorkspacePolicy::default();
        policy.work_settings.presence_check_enabled = true;
        policy.work_settings.presence_interval_minutes = 30;

        let resp = test::call_service(&app, save(policy.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let fired = h.state.presence.fire_due(kst(9, 30)).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].record_id, record_id);

        policy.work_settings.presence_check_enabled = false;
        let resp = test::call_service(&app, save(policy.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(h.state.presence.session(record_id).await.is_none());

        h.clock.set(kst(10, 0));
        policy.work_settings.presence_check_enabled = true;
        let resp = test::call_service(&app, save(policy)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let session = h.state.presence.session(record_id).await.unwrap();
        assert_eq!(session.interval_minutes, 30);
        assert!(h.state.presence.fire_due(kst(10, 29)).await.is_empty());
        assert_eq!(h.state.presence.fire_due(kst(10, 30)).await.len(), 1);
    }

    #[actix_web::test]
    async fn payroll_is_gated_and_computed() {
        let h = harness(kst(10, 0));
        let app = app!(h);
        let body = serde_json::json!({"worked": {"regular": 12540}});

        let resp = test::call_service(
            &app,
            employee(TestRequest::post()).uri("/api/payroll/compute").set_json(&body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(
            &app,
            hr(TestRequest::post()).uri("/api/payroll/compute").set_json(&body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["basePay"], 3_000_000);
        assert_eq!(json["grossPay"], 3_200_000);

        let resp = test::call_service(
            &app,
            hr(TestRequest::post())
                .uri("/api/payroll/compute")
                .set_json(serde_json::json!({"worked": {"regular": 600}, "salaryType": "HOURLY"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn leave_endpoints() {
        let h = harness(kst(10, 0));
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/leave/accrual")
                .set_json(serde_json::json!({"hireDate": "2025-01-15", "asOf": "2025-06-20"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["accrual"]["completedMonths"], 5);
        assert_eq!(json["totalDays"], 5.0);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/leave/accrual")
                .set_json(serde_json::json!({"hireDate": "2026-01-15", "asOf": "2025-06-20"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn quick_setup_walk_and_commit() {
        let h = harness(kst(10, 0));
        let app = app!(h);

        let actions = [
            serde_json::json!({"type": "SELECT_COUNTRY", "country": "KR"}),
            serde_json::json!({"type": "NEXT"}),
            serde_json::json!({"type": "SELECT_WORK_TYPE", "workType": "FLEXIBLE"}),
            serde_json::json!({"type": "NEXT"}),
            serde_json::json!({"type": "NEXT"}),
            serde_json::json!({"type": "NEXT"}),
            serde_json::json!({"type": "SELECT_LEAVE_POLICY", "leavePolicy": "LEGAL_STANDARD"}),
            serde_json::json!({"type": "NEXT"}),
        ];

        let mut state = Value::Null;
        for action in actions {
            let resp = test::call_service(
                &app,
                employee(TestRequest::post())
                    .uri("/api/quick-setup/reduce")
                    .set_json(serde_json::json!({"state": state, "action": action}))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
            let json: Value = test::read_body_json(resp).await;
            state = json["state"].clone();
        }
        assert_eq!(state["step"], "SUMMARY");

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/quick-setup/commit")
                .set_json(serde_json::json!({"state": state, "save": true}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(
            &app,
            hr(TestRequest::post())
                .uri("/api/quick-setup/commit")
                .set_json(serde_json::json!({"state": state, "save": true}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["policy"]["policyStatus"], "DRAFT");
        assert_eq!(json["policy"]["workSettings"]["type"], "FLEXIBLE");

        let stored = h.store.load_policy("ws").await.unwrap().unwrap();
        assert_eq!(stored.policy_version, "quick-setup-default");
    }

    #[actix_web::test]
    async fn quick_setup_rejects_early_commit_and_bad_back() {
        let h = harness(kst(10, 0));
        let app = app!(h);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/quick-setup/reduce")
                .set_json(serde_json::json!({"action": {"type": "BACK"}}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = test::call_service(
            &app,
            hr(TestRequest::post())
                .uri("/api/quick-setup/commit")
                .set_json(serde_json::json!({"state": {"step": "COUNTRY", "data": {}}}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["code"], "INVALID_TRANSITION");
    }

    #[actix_web::test]
    async fn roles_and_malformed_bodies() {
        let h = harness(kst(10, 0));
        let app = app!(h);

        let resp = test::call_service(&app, employee(TestRequest::get()).uri("/api/rbac/roles").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["roles"].as_array().unwrap().len(), 4);

        let resp = test::call_service(
            &app,
            employee(TestRequest::post())
                .uri("/api/attendance/checkin")
                .set_json(serde_json::json!({"workLocation": "BEACH"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
