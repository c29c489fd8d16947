pub mod config;
pub mod covalent;
pub mod observability;
pub mod types;
