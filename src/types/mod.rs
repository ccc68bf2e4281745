// ABOUTME: Domain types with validation for the deployment pipeline.
// ABOUTME: Provides type-safe IDs, branch names, module paths and payload IDs.

mod branch_name;
mod id;
mod module_path;
mod payload_id;

pub use branch_name::{BranchName, BranchNameError};
pub use id::{AccountId, AccountMarker, AppId, AppMarker, Id, ParseIdError};
pub use module_path::{ModulePath, ModulePathError};
pub use payload_id::PayloadId;
