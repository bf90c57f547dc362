//! HTTP adapter over the engine's entry points.

pub mod cycles;
pub mod executions;
pub mod health;

pub use cycles::configure_routes as configure_cycle_routes;
pub use executions::configure_routes as configure_execution_routes;
pub use health::configure_health_routes;

use actix_web::web;

/// Mount every route under the current scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_cycle_routes)
        .configure(configure_execution_routes);
}
