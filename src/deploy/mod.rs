// ABOUTME: Deployment orchestration from a local app directory to a pushed config change.
// ABOUTME: Exports the Deployer, its request and report, and the standalone app validation.

mod deployer;
mod error;
mod request;
mod validate;

pub use deployer::{DeployReport, Deployer};
pub use error::{DeployError, DeployErrorKind};
pub use request::{DEFAULT_ENVIRONMENT, DEFAULT_MODULE, PackageRequest, resolve_source_dir};
pub use validate::{DEPENDENCY_DIR, MANIFEST_FILE, ValidationError, validate_app};
