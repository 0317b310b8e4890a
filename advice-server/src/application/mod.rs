pub mod advice_ledger;
pub mod auth_service;
pub mod user_directory;
