//! Accounts: self-registration, login, and tiered user/admin management.

pub mod service;

pub use service::AccountService;
