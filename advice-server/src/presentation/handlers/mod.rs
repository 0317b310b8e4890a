pub mod advice;
pub mod auth;
pub mod user;

#[cfg(test)]
mod tests;
