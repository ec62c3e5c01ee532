pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod events;
pub mod messages;
pub mod notifications;
pub mod services;
pub mod users;

use actix_web::{middleware::from_fn, web, HttpResponse};

use crate::auth::{csrf_guard, identity_loader};

pub fn configure(cfg: &mut web::ServiceConfig) {
    // identity_loader is registered last so it runs first and csrf_guard can
    // read the resolved identity from request extensions.
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api")
            .wrap(from_fn(csrf_guard))
            .wrap(from_fn(identity_loader))
            .configure(auth::configure)
            .configure(users::configure)
            .configure(services::configure)
            .configure(appointments::configure)
            .configure(messages::configure)
            .configure(notifications::configure)
            .configure(dashboard::configure)
            .configure(events::configure),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}
