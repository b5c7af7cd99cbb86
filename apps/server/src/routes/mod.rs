use actix_web::web::ServiceConfig;

pub mod events;
pub mod health;
pub mod monitors;

pub fn routes(cfg: &mut ServiceConfig) {
    health::routes(cfg);
    monitors::routes(cfg);
    events::routes(cfg);
}
