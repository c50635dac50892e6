//! Authentication
//!
//! Bearer API tokens resolve to a [`Principal`]: the user the request acts
//! for and the role it acts with.

mod errors;
mod models;
mod repository;
mod service;
mod token;

pub use errors::*;
pub use models::*;
pub use repository::PgAuthRepository;
pub use service::*;
pub use token::*;
