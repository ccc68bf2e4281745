// ABOUTME: Validate command implementation.
// ABOUTME: Runs the deploy pre-flight checks on a directory without packaging anything.

use std::path::Path;

use sectionctl::deploy::{resolve_source_dir, validate_app};
use sectionctl::error::{Error, Result};
use sectionctl::output::Output;

pub fn validate(directory: &Path, output: &Output) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let dir = resolve_source_dir(directory, &cwd);

    let problems = validate_app(&dir);
    if problems.is_empty() {
        output.success(&format!("{} is a valid Node.js app", dir.display()));
        return Ok(());
    }

    for problem in &problems {
        output.error(&problem.to_string());
    }
    Err(Error::ValidationFailed(problems.len()))
}
