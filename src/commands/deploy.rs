// ABOUTME: Deploy command implementation.
// ABOUTME: Merges flags, config and package.json defaults into a request and runs the Deployer.

use std::path::Path;

use sectionctl::config::{Config, PackageJsonDefaults};
use sectionctl::deploy::{
    DEFAULT_ENVIRONMENT, DEFAULT_MODULE, DeployError, Deployer, PackageRequest, resolve_source_dir,
};
use sectionctl::error::Result;
use sectionctl::output::Output;
use sectionctl::package::ExcludePatterns;
use sectionctl::platform::{StaticToken, TokenSource};
use sectionctl::types::{AccountId, AppId, BranchName, Id, ModulePath};

use crate::cli::DeployArgs;

/// Package, upload and activate the app in `args.directory`.
pub async fn deploy(
    args: DeployArgs,
    mut config: Config,
    token: Option<String>,
    mut output: Output,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let source_dir = resolve_source_dir(&args.directory, &cwd);

    if let Some(url) = &args.upload_url {
        config.upload_url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.upload_timeout = timeout;
    }

    let token = match token {
        Some(token) => StaticToken::new(token).auth_token()?,
        None => config.token.auth_token()?,
    };

    let request = build_request(&args, &config, &source_dir, &cwd)?;
    tracing::debug!("Deploy request: {:?}", request);

    output.start_timer();
    let deployer = Deployer::from_config(&config, &token)?;
    let report = deployer.deploy(&request, &output).await?;

    for warning in &report.warnings {
        output.warning(warning);
    }
    output.deployed(&report);
    Ok(())
}

fn build_request(
    args: &DeployArgs,
    config: &Config,
    source_dir: &Path,
    cwd: &Path,
) -> std::result::Result<PackageRequest, DeployError> {
    let defaults = PackageJsonDefaults::discover(source_dir);

    let account: AccountId =
        pick_id(args.account_id, defaults.account_id, "account ID", "accountId")?;
    let app: AppId = pick_id(args.app_id, defaults.app_id, "app ID", "appId")?;

    let environment = args
        .environment
        .as_deref()
        .or(defaults.environment.as_deref())
        .unwrap_or(DEFAULT_ENVIRONMENT);
    let environment = BranchName::new(environment).map_err(|e| {
        DeployError::InvalidInput(format!("invalid environment '{environment}': {e}"))
    })?;

    let module = args
        .app_path
        .as_deref()
        .or(defaults.module_name.as_deref())
        .unwrap_or(DEFAULT_MODULE);
    let module = ModulePath::new(module)
        .map_err(|e| DeployError::InvalidInput(format!("invalid app path '{module}': {e}")))?;

    let mut request = PackageRequest::new(source_dir, cwd, account, app, environment, module);
    request.excludes = ExcludePatterns::new(config.exclude.iter().cloned());
    request.max_size = config.max_artifact_size;
    request.skip_validation = args.skip_validation;
    request.keep_artifact = args.skip_delete;
    request.keep_checkout = args.keep_clone;
    Ok(request)
}

/// Flag value first, then package.json, else an input error naming both.
fn pick_id<T>(
    flag: Option<u64>,
    from_package: Option<Id<T>>,
    what: &str,
    package_key: &str,
) -> std::result::Result<Id<T>, DeployError> {
    match (flag, from_package) {
        (Some(value), _) => {
            Id::new(value).map_err(|e| DeployError::InvalidInput(format!("invalid {what}: {e}")))
        }
        (None, Some(id)) => Ok(id),
        (None, None) => Err(DeployError::InvalidInput(format!(
            "missing {what}: pass it as a flag or set section.{package_key} in package.json"
        ))),
    }
}
