//! Loading configurations from disk.
//!
//! A configuration is either a single JSON file, or a directory holding a
//! `config.json` plus any number of `*.txt` word lists. Each text file
//! defines one rule named after the file stem.
//!
//! Text list syntax:
//! ```text
//! # comment
//! max_length = 9
//! number_of_words = 2
//! black cat
//! old dog
//! ```
//! Options must come before the first word. A list with any multi-word
//! line, or with `number_of_words` set, is loaded as a `phrases` rule.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::{Config, PhraseDef, RuleDef};
use crate::error::{ConfigError, LoadError};

/// Name of the JSON file expected inside a configuration directory.
pub const CONFIG_FILE: &str = "config.json";

/// Loads a configuration from a JSON file or a directory.
///
/// # Errors
/// - `LoadError::NotFound` if `path` is neither a file nor a directory
/// - `LoadError::Io` / `LoadError::Json` when a file can't be read or parsed
/// - `LoadError::Conflict` when a rule is defined both in `config.json`
///   and as a text list
/// - `LoadError::Config` when a list or the assembled configuration is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, LoadError> {
	let path = path.as_ref();
	let rules = if path.is_dir() {
		load_directory(path)?
	} else if path.is_file() {
		load_json(path)?
	} else {
		return Err(LoadError::NotFound(path.to_path_buf()));
	};
	let config = Config::from_rules(rules)?;
	info!("Loaded {} rules from {}", config.rules().count(), path.display());
	Ok(config)
}

fn load_directory(dir: &Path) -> Result<BTreeMap<String, RuleDef>, LoadError> {
	let mut lists = BTreeMap::new();
	let files = list_files(dir, "txt").map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;
	for file in files {
		let Some(name) = get_filename(&file) else {
			continue;
		};
		let lines = read_file(&file)?;
		debug!("Read list '{name}' from {} ({} lines)", file.display(), lines.len());
		lists.insert(name.clone(), parse_word_list(&name, &lines)?);
	}

	let mut rules = load_json(&dir.join(CONFIG_FILE))?;
	for (name, list) in lists {
		if rules.contains_key(&name) {
			return Err(LoadError::Conflict(name));
		}
		rules.insert(name, list);
	}
	Ok(rules)
}

fn load_json(path: &Path) -> Result<BTreeMap<String, RuleDef>, LoadError> {
	let text = fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
	serde_json::from_str(&text).map_err(|source| LoadError::Json { path: Some(path.to_path_buf()), source })
}

/// Reads a text file and returns all its lines.
fn read_file(path: &Path) -> Result<Vec<String>, LoadError> {
	let contents = fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Base file name without extension: `"./data/noun.txt"` -> `"noun"`.
fn get_filename(path: &Path) -> Option<String> {
	path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

/// Lists the files of `dir` with the given extension, sorted by path.
fn list_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(OsStr::new(extension)) {
			files.push(path);
		}
	}
	files.sort();
	Ok(files)
}

/// Options that may head a text list.
#[derive(Default)]
struct ListOptions {
	max_length: Option<usize>,
	number_of_words: Option<usize>,
}

impl ListOptions {
	/// Applies an `option = value` line.
	fn assign(&mut self, line: &str) -> Result<(), &'static str> {
		let (option, value) = line.split_once('=').ok_or("Invalid syntax")?;
		let (option, value) = (option.trim(), value.trim());
		if option.is_empty() || value.is_empty() || !option.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
			return Err("Invalid syntax");
		}
		let slot = match option {
			"max_length" => &mut self.max_length,
			"number_of_words" => &mut self.number_of_words,
			_ => return Err("Unknown option"),
		};
		*slot = Some(value.parse().map_err(|_| "Value must be a non-negative integer")?);
		Ok(())
	}
}

/// Parses the lines of a text list into a `words` or `phrases` rule.
///
/// Errors name the list and report the 1-based line number.
pub fn parse_word_list(name: &str, lines: &[String]) -> Result<RuleDef, ConfigError> {
	let invalid = |reason: String| ConfigError::new(name, reason);
	let mut options = ListOptions::default();
	let mut entries: Vec<Vec<String>> = Vec::new();

	for (line_no, raw) in lines.iter().enumerate().map(|(i, l)| (i + 1, l)) {
		let line = raw.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		if line.contains('=') {
			if !entries.is_empty() {
				return Err(invalid(format!(
					"Invalid assignment at line {line_no}: '{line}' (options must be defined before words)"
				)));
			}
			options
				.assign(line)
				.map_err(|why| invalid(format!("Invalid assignment at line {line_no}: '{line}' ({why})")))?;
			continue;
		}

		let words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
		if !words.iter().all(|w| is_valid_word(w)) {
			return Err(invalid(format!("Invalid syntax at line {line_no}: '{line}'")));
		}
		let text = words.join(" ");
		if let Some(max) = options.max_length {
			if text.chars().count() > max {
				let what = if words.len() == 1 { "Word" } else { "Phrase" };
				return Err(invalid(format!("{what} is too long at line {line_no}: '{text}'")));
			}
		}
		if let Some(expected) = options.number_of_words {
			if words.len() != expected {
				return Err(invalid(format!(
					"Phrase has {} word(s) (while number_of_words={expected}) at line {line_no}: '{text}'",
					words.len()
				)));
			}
		}
		entries.push(words);
	}

	let as_phrases = options.number_of_words.is_some() || entries.iter().any(|e| e.len() > 1);
	let mut def = RuleDef {
		max_length: options.max_length,
		number_of_words: options.number_of_words,
		..RuleDef::default()
	};
	if as_phrases {
		def.kind = Some("phrases".to_owned());
		def.phrases = Some(entries.into_iter().map(PhraseDef::Words).collect());
	} else {
		def.kind = Some("words".to_owned());
		def.words = Some(entries.into_iter().flatten().collect());
	}
	Ok(def)
}

/// Words are made of letters, digits, `-` and `'`.
fn is_valid_word(word: &str) -> bool {
	word.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '\'')
}
