pub mod domain;
pub mod error;
pub mod messages;

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
