//! CLI Commands

mod eligibility;
mod init;
mod registry;
mod secret;
mod tally;

pub use eligibility::EligibilityCommand;
pub use init::InitCommand;
pub use registry::RegistryCommand;
pub use secret::SecretCommand;
pub use tally::TallyCommand;
