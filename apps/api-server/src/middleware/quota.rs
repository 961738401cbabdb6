//! Quota enforcement middleware.

use std::future::{Future, Ready, ready};
use std::pin::Pin;

use actix_web::{
    Error, HttpMessage, HttpRequest, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderMap, HeaderName, HeaderValue},
    web,
};

use quotaguard_core::ports::AdmissionControl;
use quotaguard_core::{AdmissionDecision, AdmissionRequest, QuotaStatus, RequestOrigin};

use crate::middleware::error::AppError;
use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Middleware factory enforcing one quota tier on the wrapped service.
///
/// ```ignore
/// web::resource("/upload")
///     .wrap(QuotaGuard::tier(UPLOAD_TIER))
///     .route(web::post().to(upload));
/// ```
pub struct QuotaGuard {
    tier: String,
}

impl QuotaGuard {
    pub fn tier(tier: impl Into<String>) -> Self {
        Self { tier: tier.into() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for QuotaGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = QuotaGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(QuotaGuardService {
            service,
            tier: self.tier.clone(),
        }))
    }
}

pub struct QuotaGuardService<S> {
    service: S,
    tier: String,
}

impl<S, B> Service<ServiceRequest> for QuotaGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
            // Fail open: a quota misconfiguration must not take the route down.
            tracing::error!(tier = %self.tier, "AppState missing, skipping quota check");
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        };

        let request = admission_request(req.request(), &self.tier, &state);

        match state.admission.check(&request) {
            AdmissionDecision::Denied(denial) => {
                let response = AppError::from(denial).error_response();
                let (http_req, _payload) = req.into_parts();
                let srv_response = ServiceResponse::new(http_req, response);

                Box::pin(async move { Ok(srv_response.map_into_right_body()) })
            }
            AdmissionDecision::Allowed(status) => {
                req.extensions_mut().insert(status.clone());

                let fut = self.service.call(req);
                Box::pin(async move {
                    let mut res = fut.await?;
                    insert_quota_headers(res.headers_mut(), &status);
                    Ok(res.map_into_left_body())
                })
            }
        }
    }
}

/// Map an HTTP request onto the transport-agnostic admission input.
fn admission_request(req: &HttpRequest, tier: &str, state: &AppState) -> AdmissionRequest {
    let forwarded_for = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let peer_addr = req.peer_addr().map(|addr| addr.ip().to_string());

    let request = AdmissionRequest::new(tier)
        .with_origin(RequestOrigin::new(forwarded_for, peer_addr));

    with_caller_identity(request, req, state)
}

#[cfg(feature = "auth")]
fn with_caller_identity(
    request: AdmissionRequest,
    req: &HttpRequest,
    state: &AppState,
) -> AdmissionRequest {
    match super::auth::resolve_claims(req, state.tokens.as_ref()) {
        Some(claims) => {
            let privileged = claims.is_privileged();
            request.with_user(claims.user_id).with_privileged(privileged)
        }
        None => request,
    }
}

#[cfg(not(feature = "auth"))]
fn with_caller_identity(
    request: AdmissionRequest,
    _req: &HttpRequest,
    _state: &AppState,
) -> AdmissionRequest {
    request
}

fn insert_quota_headers(headers: &mut HeaderMap, status: &QuotaStatus) {
    for (name, value) in status.header_pairs() {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            headers.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{App, HttpResponse, http::StatusCode, test};
    use quotaguard_core::domain::{DEFAULT_TIER, HEAVY_OPERATION_TIER};
    use quotaguard_core::{PolicyTier, QuotaPolicyTable};

    use super::*;
    use crate::state::test_state;

    fn two_per_minute() -> QuotaPolicyTable {
        QuotaPolicyTable::new([
            PolicyTier::new(DEFAULT_TIER, 2, Duration::from_secs(60)).unwrap(),
            PolicyTier::new(HEAVY_OPERATION_TIER, 1, Duration::from_secs(60)).unwrap(),
        ])
        .unwrap()
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_allowed_requests_carry_quota_headers() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(two_per_minute())))
                .service(
                    web::resource("/op")
                        .wrap(QuotaGuard::tier(DEFAULT_TIER))
                        .route(web::get().to(ok)),
                ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/op")
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "2");
        assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "1");
        assert_eq!(res.headers().get("x-ratelimit-reset").unwrap(), "1700000060");
        assert_eq!(res.headers().get("x-ratelimit-window").unwrap(), "60");
    }

    #[actix_web::test]
    async fn test_exhausted_quota_returns_429() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(two_per_minute())))
                .service(
                    web::resource("/heavy")
                        .wrap(QuotaGuard::tier(HEAVY_OPERATION_TIER))
                        .route(web::post().to(ok)),
                ),
        )
        .await;

        let request = || {
            test::TestRequest::post()
                .uri("/heavy")
                .insert_header((FORWARDED_FOR, "203.0.113.5, 10.0.0.1"))
                .peer_addr("10.0.0.1:4000".parse().unwrap())
                .to_request()
        };

        let res = test::call_service(&app, request()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = test::call_service(&app, request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("retry-after").unwrap(), "60");
        assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "0");

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 429);
        assert_eq!(body["retry_after"], 60);
        assert_eq!(body["detail"], "Rate limit exceeded. Try again in 60 seconds.");

        // A different forwarded origin has its own quota.
        let other = test::TestRequest::post()
            .uri("/heavy")
            .insert_header((FORWARDED_FOR, "198.51.100.9"))
            .to_request();
        assert_eq!(test::call_service(&app, other).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_untrusted_forwarded_for_keys_on_peer() {
        use std::sync::Arc;

        use quotaguard_core::ports::ManualClock;
        use quotaguard_infra::QuotaState;

        use crate::config::AppConfig;

        let config = AppConfig::from_vars(
            [
                ("TRUST_FORWARDED_FOR", "false"),
                ("QUOTA_TIER_DEFAULT", "1,60"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        let state = AppState::new(
            &config,
            Arc::new(QuotaState::default()),
            Arc::new(ManualClock::at_epoch_secs(1_700_000_000)),
        );

        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::resource("/op")
                    .wrap(QuotaGuard::tier(DEFAULT_TIER))
                    .route(web::get().to(ok)),
            ),
        )
        .await;

        let request = |forwarded: &str| {
            test::TestRequest::get()
                .uri("/op")
                .insert_header((FORWARDED_FOR, forwarded.to_string()))
                .peer_addr("10.0.0.1:4000".parse().unwrap())
                .to_request()
        };

        let res = test::call_service(&app, request("203.0.113.5")).await;
        assert_eq!(res.status(), StatusCode::OK);

        // A spoofed header does not buy a fresh quota.
        let res = test::call_service(&app, request("198.51.100.9")).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[cfg(feature = "auth")]
    #[actix_web::test]
    async fn test_subscriber_token_gets_privileged_tier() {
        use actix_web::http::header;
        use quotaguard_core::domain::PRIVILEGED_TIER;
        use quotaguard_core::ports::{PRIVILEGED_ROLE, TokenService};

        let mut policies = two_per_minute();
        policies.insert(PolicyTier::new(PRIVILEGED_TIER, 50, Duration::from_secs(60)).unwrap());
        let state = test_state(policies);
        let token = state
            .tokens
            .generate_token("42", vec![PRIVILEGED_ROLE.to_string()])
            .unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::resource("/op")
                    .wrap(QuotaGuard::tier(DEFAULT_TIER))
                    .route(web::get().to(ok)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/op")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "50");
    }

    #[actix_web::test]
    async fn test_missing_state_fails_open() {
        let app = test::init_service(
            App::new().service(
                web::resource("/op")
                    .wrap(QuotaGuard::tier(DEFAULT_TIER))
                    .route(web::get().to(ok)),
            ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/op").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get("x-ratelimit-limit").is_none());
    }
}
