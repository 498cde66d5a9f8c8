pub mod domain;
pub mod error;
pub mod protocol;

#[cfg(test)]
mod tests;
