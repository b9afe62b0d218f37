use std::fmt;
use std::io;
use std::path::PathBuf;

/// Structural problem found while validating or compiling a configuration.
///
/// Always names the offending rule. Raised only while a `Generator` is being
/// constructed; a generator is never returned half-built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
	rule: String,
	reason: String,
}

impl ConfigError {
	pub fn new(rule: impl Into<String>, reason: impl Into<String>) -> Self {
		Self { rule: rule.into(), reason: reason.into() }
	}

	/// Name of the rule the error was detected on.
	pub fn rule(&self) -> &str {
		&self.rule
	}

	/// Human-readable description of the problem.
	pub fn reason(&self) -> &str {
		&self.reason
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Invalid config at rule '{}': {}", self.rule, self.reason)
	}
}

impl std::error::Error for ConfigError {}

/// Errors returned by the generation calls of a built `Generator`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
	/// No generator root with this name exists in the configuration.
	UnknownRoot(String),
	/// Lazy construction of an auxiliary root failed.
	Config(ConfigError),
}

impl fmt::Display for GenerateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GenerateError::UnknownRoot(name) => write!(f, "Unknown generator root '{name}'"),
			GenerateError::Config(e) => fmt::Display::fmt(e, f),
		}
	}
}

impl std::error::Error for GenerateError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			GenerateError::Config(e) => Some(e),
			GenerateError::UnknownRoot(_) => None,
		}
	}
}

impl From<ConfigError> for GenerateError {
	fn from(e: ConfigError) -> Self {
		GenerateError::Config(e)
	}
}

/// Errors raised while loading a configuration from disk.
#[derive(Debug)]
pub enum LoadError {
	/// Neither a file nor a directory exists at the path.
	NotFound(PathBuf),
	/// Reading a file failed.
	Io { path: PathBuf, source: io::Error },
	/// A configuration file is not valid JSON or does not match the rule schema.
	Json { path: Option<PathBuf>, source: serde_json::Error },
	/// A rule is defined both in `config.json` and as a `.txt` word list.
	Conflict(String),
	/// The loaded configuration is structurally invalid.
	Config(ConfigError),
}

impl fmt::Display for LoadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LoadError::NotFound(path) => write!(f, "File or directory not found: {}", path.display()),
			LoadError::Io { path, source } => write!(f, "Failed to read {}: {source}", path.display()),
			LoadError::Json { path: Some(path), source } => {
				write!(f, "Invalid JSON in {}: {source}", path.display())
			}
			LoadError::Json { path: None, source } => write!(f, "Invalid JSON: {source}"),
			LoadError::Conflict(name) => write!(
				f,
				"Conflict: list '{name}' is defined both in config and in *.txt file. \
				 If it's a 'words' list, you should remove it from config."
			),
			LoadError::Config(e) => fmt::Display::fmt(e, f),
		}
	}
}

impl std::error::Error for LoadError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			LoadError::Io { source, .. } => Some(source),
			LoadError::Json { source, .. } => Some(source),
			LoadError::Config(e) => Some(e),
			LoadError::NotFound(_) | LoadError::Conflict(_) => None,
		}
	}
}

impl From<ConfigError> for LoadError {
	fn from(e: ConfigError) -> Self {
		LoadError::Config(e)
	}
}
