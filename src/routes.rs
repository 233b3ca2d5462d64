use crate::{
    api::{attendance, device, employee, sync},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Result, anyhow};

type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Limiter state, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimits {
    protected: Limiter,
    sync: Limiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            protected: build_limiter(config.rate_protected_per_min)?,
            sync: build_limiter(config.rate_sync_per_min)?,
        })
    }
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .service(
                web::scope("/employee")
                    // /employee
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employee/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/device")
                    .service(
                        web::resource("")
                            .route(web::post().to(device::create_device))
                            .route(web::get().to(device::list_devices)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(device::delete_device)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance?date=
                    .service(web::resource("").route(web::get().to(attendance::daily_log)))
                    // /attendance/sync
                    .service(
                        web::resource("/sync")
                            .wrap(Governor::new(&limits.sync))
                            .route(web::post().to(sync::sync_attendance)),
                    )
                    // /attendance/sync-all
                    .service(
                        web::resource("/sync-all")
                            .wrap(Governor::new(&limits.sync))
                            .route(web::post().to(sync::sync_all_devices)),
                    )
                    .service(
                        web::resource("/test-connection")
                            .route(web::post().to(sync::test_connection)),
                    )
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::put().to(attendance::check_out)),
                    )
                    // /attendance/history/{employee_id}
                    .service(
                        web::resource("/history/{employee_id}")
                            .route(web::get().to(attendance::history)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::device::{PunchSource, SimulatedSource};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn config(sync_per_min: &str) -> Config {
        let sync_per_min = sync_per_min.to_string();
        Config::from_lookup(move |key| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".to_string()),
            "RATE_SYNC_PER_MIN" => Some(sync_per_min.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn peer() -> SocketAddr {
        "10.1.2.3:40000".parse().unwrap()
    }

    #[actix_web::test]
    async fn test_zero_rate_is_clamped() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }

    #[actix_web::test]
    async fn test_routes_mount_under_prefix_and_limit_sync() {
        let pool = test_pool().await;
        let config = config("1");
        let limits = RateLimits::from_config(&config).unwrap();
        let source: Arc<dyn PunchSource> = Arc::new(SimulatedSource);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::new(config.clone()))
                .app_data(web::Data::from(source))
                .configure(|cfg| configure(cfg, &config, &limits)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/employee")
            .peer_addr(peer())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/attendance/test-connection")
            .peer_addr(peer())
            .set_json(json!({ "ip": "10.0.0.5" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let sync_req = || {
            test::TestRequest::post()
                .uri("/api/attendance/sync")
                .peer_addr(peer())
                .set_json(json!({ "ip": "10.0.0.5", "date": "2024-07-29" }))
                .to_request()
        };
        assert_eq!(test::call_service(&app, sync_req()).await.status(), StatusCode::OK);

        let limited = test::try_call_service(&app, sync_req())
            .await
            .map(|res| res.status())
            .unwrap_or_else(|e| e.as_response_error().status_code());
        assert_eq!(limited, StatusCode::TOO_MANY_REQUESTS);
    }
}
