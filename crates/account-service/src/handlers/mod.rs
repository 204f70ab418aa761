//! HTTP request handlers for the account service.

pub mod account_handler;
pub mod health_handler;
pub mod metrics_handler;

pub use account_handler::{
    delete_account, get_account, sign_in, sign_out, signup_admin, signup_pilot, transfer_owner,
    update_profile,
};
pub use health_handler::{health_check, readiness_check};
pub use metrics_handler::metrics_handler;
