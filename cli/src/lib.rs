//! Terminal views for the product catalogue.

pub mod shell;
pub mod views;

pub use shell::Shell;
