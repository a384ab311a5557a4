// Local side of a push: the `name:version` tag given on the command line
// and the bento directory it resolves to inside the local repository.

use crate::error::{CliError, Result};
use crate::schemas::BentoMlYaml;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Descriptor file every bento directory carries at its root.
pub const DESCRIPTOR_FILE: &str = "bentoml.yml";

/// `name:version` reference to a bento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BentoTag {
    pub name: String,
    pub version: String,
}

impl FromStr for BentoTag {
    type Err = CliError;

    /// Splits on the first `:`. The version is mandatory.
    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = s.split_once(':').unwrap_or((s, ""));
        if name.is_empty() {
            return Err(CliError::Input(format!("Please specify the bento name: {s}")));
        }
        if version.is_empty() {
            return Err(CliError::Input("Please specify the bento version".into()));
        }
        Ok(BentoTag {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl fmt::Display for BentoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// `~/bentoml/repository`, or `./bentoml/repository` without a home dir.
pub fn default_repository() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bentoml")
        .join("repository")
}

/// A bento found on disk, with its descriptor already parsed.
#[derive(Debug, Clone)]
pub struct LocalBento {
    pub tag: BentoTag,
    pub path: PathBuf,
    pub descriptor: BentoMlYaml,
}

impl LocalBento {
    /// Resolves `{repository}/{name}/{version}` and parses its descriptor.
    pub fn open(repository: &Path, tag: &BentoTag) -> Result<Self> {
        let path = repository.join(&tag.name).join(&tag.version);
        let descriptor_path = path.join(DESCRIPTOR_FILE);
        if !descriptor_path.is_file() {
            return Err(CliError::Input(format!("Cannot found this bento: {tag}")));
        }
        debug!(bento = %tag, path = %path.display(), "loading bento descriptor");
        let raw = std::fs::read_to_string(&descriptor_path)?;
        let descriptor: BentoMlYaml = serde_yaml::from_str(&raw)?;
        Ok(LocalBento {
            tag: tag.clone(),
            path,
            descriptor,
        })
    }

    pub fn name(&self) -> &str {
        &self.tag.name
    }

    pub fn version(&self) -> &str {
        &self.tag.version
    }
}
