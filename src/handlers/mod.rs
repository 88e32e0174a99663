pub mod attempt_handler;
pub mod auth_handler;
pub mod user_handler;

use actix_web::web;

pub use attempt_handler::{
    abandon_attempt, get_attempt, navigate, select_answer, start_attempt, submit_attempt,
};
pub use auth_handler::{callback, login, logout};
pub use user_handler::{admin_area, current_user, health_check};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(login)
        .service(callback)
        .service(logout)
        .service(current_user)
        .service(admin_area)
        .service(start_attempt)
        .service(get_attempt)
        .service(select_answer)
        .service(navigate)
        .service(submit_attempt)
        .service(abandon_attempt);
}
