pub mod commands;
pub mod context;
pub mod docker;
pub mod error;

#[cfg(test)]
pub mod test_utils;
