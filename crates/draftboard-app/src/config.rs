// Configuration loading and parsing (config/board.toml).

use draftboard_core::teams::MAX_TEAM_COUNT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub ws_port: u16,
    pub db_path: String,
    /// CSV loaded into an empty player table at startup, if set.
    pub seed_csv: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Teams created by INITIALIZE_TEAMS when no count is given.
    #[serde(default = "default_num_teams")]
    pub num_teams: usize,
    /// Budget per team when INITIALIZE_TEAMS gives none.
    #[serde(default = "default_budget")]
    pub default_budget: u32,
}

fn default_num_teams() -> usize {
    draftboard_core::teams::DEFAULT_TEAM_COUNT
}

fn default_budget() -> u32 {
    draftboard_core::teams::DEFAULT_BUDGET
}

// ---------------------------------------------------------------------------
// board.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire board.toml file.
#[derive(Debug, Clone, Deserialize)]
struct BoardFile {
    league: LeagueConfig,
    websocket: WebsocketSection,
    database: DatabaseSection,
    #[serde(default)]
    ingest: IngestSection,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IngestSection {
    seed_csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/board.toml` relative to
/// `base_dir`. Does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let board_path = base_dir.join("config").join("board.toml");
    let text = read_file(&board_path)?;
    let file: BoardFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: board_path.clone(),
        source: e,
    })?;

    let config = Config {
        league: file.league,
        ws_port: file.websocket.port,
        db_path: file.database.path,
        seed_csv: file.ingest.seed_csv.filter(|p| !p.trim().is_empty()),
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` with every file in `defaults/` that it lacks. Existing
/// config files are never overwritten and `.example` files stay behind.
/// Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    match (defaults_dir.is_dir(), config_dir.is_dir()) {
        (false, false) => {
            return Err(copy_error(format!(
                "neither defaults/ nor config/ directory found in {}; \
                 run from the project root or ensure defaults/ is present",
                base_dir.display()
            )))
        }
        (false, true) => return Ok(Vec::new()),
        (true, _) => {}
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut written = Vec::new();
    for source in default_files(&defaults_dir)? {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if seed_file(&source, &target)? {
            written.push(target);
        }
    }
    Ok(written)
}

/// Regular files under `defaults/`, minus `.example` templates, sorted by name.
fn default_files(defaults_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| copy_error(format!("cannot read defaults entry: {e}")))?
            .path();
        let is_example = path.extension().is_some_and(|ext| ext == "example");
        if path.is_file() && !is_example {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy `source` to `target` unless `target` already exists. The create is
/// exclusive, so a file that appears concurrently is left alone.
fn seed_file(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    use std::io::Write;

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("cannot create {}: {e}", target.display()))),
    };

    let bytes = std::fs::read(source)
        .map_err(|e| copy_error(format!("cannot read {}: {e}", source.display())))?;
    dest.write_all(&bytes)
        .map_err(|e| copy_error(format!("cannot write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.num_teams == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.num_teams".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.league.num_teams > MAX_TEAM_COUNT {
        return Err(ConfigError::ValidationError {
            field: "league.num_teams".into(),
            message: format!("must be at most {MAX_TEAM_COUNT}"),
        });
    }

    if config.league.default_budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.default_budget".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.ws_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the path to the draftboard-app crate root (works whether
    /// `cargo test` runs from the crate root or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/draftboard-app/defaults").exists() {
            cwd.join("crates/draftboard-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Helper: a scratch directory with `config/board.toml` set to `contents`.
    fn scratch_with_board(name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/board.toml"), contents).unwrap();
        tmp
    }

    fn default_board_text() -> String {
        fs::read_to_string(project_root().join("defaults/board.toml")).unwrap()
    }

    #[test]
    fn load_default_board_toml() {
        let tmp = scratch_with_board("draftboard_config_defaults", &default_board_text());
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.league.name, "Draft Board League");
        assert_eq!(config.league.num_teams, 12);
        assert_eq!(config.league.default_budget, 200);
        assert_eq!(config.ws_port, 9002);
        assert_eq!(config.db_path, "draftboard.db");
        assert!(config.seed_csv.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn league_counts_default_when_omitted() {
        let text = r#"
[league]
name = "Minimal"

[websocket]
port = 9100

[database]
path = ":memory:"
"#;
        let tmp = scratch_with_board("draftboard_config_minimal", text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.league.num_teams, 12);
        assert_eq!(config.league.default_budget, 200);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seed_csv_is_read_and_blank_is_ignored() {
        let with_seed = default_board_text()
            .replace("# seed_csv = \"data/players.csv\"", "seed_csv = \"data/players.csv\"");
        let tmp = scratch_with_board("draftboard_config_seed", &with_seed);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.seed_csv.as_deref(), Some("data/players.csv"));
        let _ = fs::remove_dir_all(&tmp);

        let blank = default_board_text()
            .replace("# seed_csv = \"data/players.csv\"", "seed_csv = \"  \"");
        let tmp = scratch_with_board("draftboard_config_seed_blank", &blank);
        let config = load_config_from(&tmp).unwrap();
        assert!(config.seed_csv.is_none());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_num_teams_zero() {
        let text = default_board_text().replace("num_teams = 12", "num_teams = 0");
        let tmp = scratch_with_board("draftboard_config_num_teams_zero", &text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "league.num_teams");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_num_teams_above_maximum() {
        let text = default_board_text().replace("num_teams = 12", "num_teams = 100000");
        let tmp = scratch_with_board("draftboard_config_num_teams_huge", &text);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(
            matches!(&err, ConfigError::ValidationError { field, .. } if field == "league.num_teams")
        );
        let _ = fs::remove_dir_all(&tmp);

        let text = default_board_text().replace(
            "num_teams = 12",
            &format!("num_teams = {MAX_TEAM_COUNT}"),
        );
        let tmp = scratch_with_board("draftboard_config_num_teams_max", &text);
        assert_eq!(load_config_from(&tmp).unwrap().league.num_teams, MAX_TEAM_COUNT);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_default_budget_zero() {
        let text = default_board_text().replace("default_budget = 200", "default_budget = 0");
        let tmp = scratch_with_board("draftboard_config_budget_zero", &text);
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "league.default_budget");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_db_path() {
        let text = default_board_text().replace("path = \"draftboard.db\"", "path = \"\"");
        let tmp = scratch_with_board("draftboard_config_empty_db", &text);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(
            matches!(&err, ConfigError::ValidationError { field, .. } if field == "database.path")
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_board_toml() {
        let tmp = std::env::temp_dir().join("draftboard_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("board.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch_with_board("draftboard_config_invalid", "this is not valid [[[ toml");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("board.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("draftboard_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::copy(
            project_root().join("defaults/board.toml"),
            defaults_dir.join("board.toml"),
        )
        .unwrap();
        fs::write(defaults_dir.join("players.csv.example"), "name,position,team\n").unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/board.toml").exists());
        assert!(!tmp.join("config/players.csv.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("draftboard_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();
        fs::copy(
            project_root().join("defaults/board.toml"),
            defaults_dir.join("board.toml"),
        )
        .unwrap();
        fs::write(config_dir.join("board.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        let content = fs::read_to_string(config_dir.join("board.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_ignores_subdirectories_and_tolerates_config_only() {
        let tmp = std::env::temp_dir().join("draftboard_config_ensure_subdirs");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(defaults_dir.join("nested")).unwrap();
        fs::write(defaults_dir.join("nested/inner.toml"), "x = 1\n").unwrap();
        fs::write(defaults_dir.join("b.toml"), "b = 1\n").unwrap();
        fs::write(defaults_dir.join("a.toml"), "a = 1\n").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(
            copied,
            vec![tmp.join("config/a.toml"), tmp.join("config/b.toml")]
        );
        assert!(!tmp.join("config/nested").exists());

        fs::remove_dir_all(&defaults_dir).unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("draftboard_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
