use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    auth::{new_id, Identity},
    error::{ApiError, ApiResult},
    models::{ServiceDto, ServiceRow},
    response::Envelope,
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/services")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(web::resource("/services/{id}").route(web::post().to(update)));
}

#[derive(Debug, Deserialize)]
struct CreateServicePayload {
    name: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct UpdateServicePayload {
    name: Option<String>,
    price: Option<f64>,
}

fn check_price(price: f64) -> ApiResult<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::validation("Price must be a non-negative number"));
    }
    Ok(price)
}

async fn list(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let rows =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price FROM services ORDER BY name")
            .fetch_all(&state.db)
            .await?;
    let services: Vec<ServiceDto> = rows.into_iter().map(ServiceDto::from).collect();

    Ok(HttpResponse::Ok().json(Envelope::data(services)))
}

async fn create(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    payload: web::Json<CreateServicePayload>,
) -> ApiResult<HttpResponse> {
    identity.require_admin()?;

    let payload = payload.into_inner();
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Service name is required"));
    }
    let price = check_price(payload.price)?;

    let id = new_id();
    sqlx::query("INSERT INTO services (id, name, price) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&name)
        .bind(price)
        .execute(&state.db)
        .await?;

    let service =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price FROM services WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await?;

    Ok(
        HttpResponse::Ok()
            .json(Envelope::message("Service created").with_data(ServiceDto::from(service))),
    )
}

async fn update(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
    payload: web::Json<UpdateServicePayload>,
) -> ApiResult<HttpResponse> {
    identity.require_admin()?;
    let id = path.into_inner();

    let current =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price FROM services WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Service not found"))?;

    let payload = payload.into_inner();
    let name = match payload.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::validation("Service name cannot be empty"));
            }
            name
        }
        None => current.name,
    };
    let price = match payload.price {
        Some(price) => check_price(price)?,
        None => current.price,
    };

    sqlx::query("UPDATE services SET name = ?, price = ? WHERE id = ?")
        .bind(&name)
        .bind(price)
        .bind(&id)
        .execute(&state.db)
        .await?;

    let service =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price FROM services WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await?;

    Ok(
        HttpResponse::Ok()
            .json(Envelope::message("Service updated").with_data(ServiceDto::from(service))),
    )
}
