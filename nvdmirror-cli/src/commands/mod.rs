//! Command handlers -- one module per subcommand

pub mod config;
pub mod import;
pub mod scan;
pub mod search;
pub mod status;
pub mod sync;
