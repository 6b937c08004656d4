//! Settings file (`queue.toml`)

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use queue_token_core::{ServiceSeed, DEFAULT_CHANGE_TIMEOUT};
use serde::Deserialize;

const FILE_NAME: &str = "queue.toml";

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(skip)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub staff_key: Option<String>,

    #[serde(default = "default_change_timeout")]
    pub change_timeout: u32,

    #[serde(default)]
    pub services: Vec<ServiceSeed>,
}

fn default_change_timeout() -> u32 {
    DEFAULT_CHANGE_TIMEOUT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            staff_key: None,
            change_timeout: DEFAULT_CHANGE_TIMEOUT,
            services: Vec::new(),
        }
    }
}

impl Settings {
    /// Load the settings from `path`, or search for `queue.toml` from the
    /// working directory upwards
    ///
    /// A missing file is only an error if `path` was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let contents = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("could not read {}", path.display()))?;
            return Self::parse(&contents, path.to_owned());
        }

        Self::search(&std::env::current_dir()?)
    }

    /// Look for `queue.toml` in `dir` and its ancestors, falling back to the
    /// defaults
    fn search(dir: &Path) -> Result<Self> {
        let mut path = dir.to_owned();
        loop {
            path.push(FILE_NAME);

            match std::fs::read_to_string(&path) {
                Ok(s) => return Self::parse(&s, path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }

            path.pop();
            if !path.pop() {
                return Ok(Self::default());
            }
        }
    }

    fn parse(contents: &str, source: PathBuf) -> Result<Self> {
        let mut settings: Settings = toml::from_str(contents)
            .wrap_err_with(|| format!("invalid settings in {}", source.display()))?;
        settings.source = Some(source);
        Ok(settings)
    }
}
