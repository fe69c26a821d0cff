//! Bootstrapping the content of a newly created project.

use std::fs;
use std::path::Path;

use crate::config::LocalConfiguration;
use crate::error::Result;

/// Populates a freshly initialised project directory before its first
/// commit.
pub trait ProjectCreator {
    fn create(&self, dir: &Path, configuration: &LocalConfiguration) -> Result<()>;
}

impl<F> ProjectCreator for F
where
    F: Fn(&Path, &LocalConfiguration) -> Result<()>,
{
    fn create(&self, dir: &Path, configuration: &LocalConfiguration) -> Result<()> {
        self(dir, configuration)
    }
}

/// Writes a `README.md` holding the project name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadmeCreator;

impl ReadmeCreator {
    pub const FILE_NAME: &'static str = "README.md";
}

impl ProjectCreator for ReadmeCreator {
    fn create(&self, dir: &Path, configuration: &LocalConfiguration) -> Result<()> {
        let name = configuration.project_name.as_deref().unwrap_or_default();
        fs::write(dir.join(Self::FILE_NAME), format!("# {}\n", name))?;
        Ok(())
    }
}
