use crate::model::device::Device;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateDevice {
    #[schema(example = "Main gate")]
    pub name: String,
    #[schema(example = "192.168.1.201")]
    pub ip_address: String,
    #[schema(example = 80, nullable = true)]
    pub port: Option<u16>,
    #[schema(example = "admin", nullable = true)]
    pub username: Option<String>,
    #[schema(nullable = true)]
    pub password: Option<String>,
    #[schema(example = "HQ", nullable = true)]
    pub location: Option<String>,
}

/// Registered devices in id order
pub async fn registered_devices(pool: &SqlitePool) -> Result<Vec<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>(
        r#"
        SELECT id, name, ip_address, port, username, password, location
        FROM devices
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Register Device
#[utoipa::path(
    post,
    path = "/api/device",
    request_body = CreateDevice,
    responses(
        (status = 201, description = "Device registered", body = Object, example = json!({
            "message": "Device registered",
            "id": 1
        })),
        (status = 400, description = "Missing name or IP"),
        (status = 409, description = "Device already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Device"
)]
pub async fn create_device(
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateDevice>,
) -> impl Responder {
    if payload.name.trim().is_empty() || payload.ip_address.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "message": "name and ip_address are required"
        }));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO devices (name, ip_address, port, username, password, location)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.ip_address.trim())
    .bind(payload.port.map(i64::from))
    .bind(&payload.username)
    .bind(&payload.password)
    .bind(&payload.location)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            info!(ip = %payload.ip_address, "Device registered");
            HttpResponse::Created().json(json!({
                "message": "Device registered",
                "id": done.last_insert_rowid()
            }))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            HttpResponse::Conflict().json(json!({
                "message": "Device already registered"
            }))
        }
        Err(e) => {
            error!(error = %e, "Failed to register device");
            HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, Contact with system admin"
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/device",
    responses(
        (status = 200, description = "Registered devices", body = [Device])
    ),
    tag = "Device"
)]
pub async fn list_devices(pool: web::Data<SqlitePool>) -> actix_web::Result<impl Responder> {
    let devices = registered_devices(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch devices");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(devices))
}

/// Delete Device
#[utoipa::path(
    delete,
    path = "/api/device/{device_id}",
    params(
        ("device_id" = i64, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Device not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Device"
)]
pub async fn delete_device(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let device_id = path.into_inner();

    let result = sqlx::query("DELETE FROM devices WHERE id = ?")
        .bind(device_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, device_id, "Failed to delete device");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Device not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_register_list_and_delete_devices() {
        let pool = test_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .service(
                    web::resource("/device")
                        .route(web::post().to(create_device))
                        .route(web::get().to(list_devices)),
                )
                .service(web::resource("/device/{id}").route(web::delete().to(delete_device))),
        )
        .await;

        let body = json!({
            "name": "Main gate",
            "ip_address": "192.168.1.201",
            "port": 80,
            "username": "admin",
            "password": "secret"
        });
        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let req = test::TestRequest::post()
                .uri("/device")
                .set_json(body.clone())
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }

        let req = test::TestRequest::post()
            .uri("/device")
            .set_json(json!({ "name": "Gate", "ip_address": " " }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/device").to_request();
        let devices: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(devices[0]["ip_address"], "192.168.1.201");
        assert_eq!(devices[0]["port"], 80);
        assert!(devices[0].get("password").is_none());

        let id = devices[0]["id"].as_i64().unwrap();
        let req = test::TestRequest::delete()
            .uri(&format!("/device/{id}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/device/{id}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
