//! Users domain: accounts, profile details, and the register/login/info flows.
//!
//! Storage is reached only through [`UsersRepository`]; adapters live in `crm-infra`.

pub mod repository;
pub mod service;
pub mod user;

pub use repository::UsersRepository;
pub use service::UsersService;
pub use user::{Email, NewUser, ProfileUpdate, Registration, User, UserDetails, UserInfo};
