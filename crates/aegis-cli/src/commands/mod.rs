//! CLI command implementations.
//!
//! - [`vault`] - Secret vault operations
//! - [`audit`] - Audit log inspection
//! - [`guard`] - Abuse-state administration

pub mod audit;
pub mod guard;
pub mod vault;

pub use audit::AuditCommand;
pub use guard::GuardCommand;
pub use vault::VaultCommand;
