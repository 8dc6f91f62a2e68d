//! Tenant lifecycle: prefixes, handles, their expiration jobs, and the
//! registry that hands out exactly one handle per prefix.

pub mod handle;
pub mod janitor;
pub mod prefix;
pub mod registry;

pub use handle::{TenantHandle, TenantStats};
pub use janitor::{Janitor, JanitorState, JanitorStats};
pub use prefix::{Prefix, TableKind};
pub use registry::TenantRegistry;
