// ABOUTME: Command module aggregator for the sectionctl CLI.
// ABOUTME: Re-exports deploy and validate command handlers.

mod deploy;
mod validate;

pub use deploy::deploy;
pub use validate::validate;
