//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TallyConfig;
use super::secret::secret_string;
use crate::domain::errors::TallyError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TallyConfig
/// 4. Applies environment variable overrides (TALLY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use tally::config::loader::load_config;
///
/// let config = load_config("tally.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TallyConfig> {
    let config = parse_config_file(path)?;

    config.validate().map_err(|e| {
        TallyError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Reads, substitutes and parses a configuration file without validating it
///
/// Used where a partially valid configuration is still useful, such as
/// picking up the logging section before the command runs.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<TallyConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TallyError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TallyError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: TallyConfig = toml::from_str(&contents)
        .map_err(|e| TallyError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. All missing variables are reported
/// together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TallyError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TallyError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using TALLY_* prefix
///
/// Environment variables follow the pattern: TALLY_<SECTION>_<KEY>
/// For example: TALLY_SELECTION_IDENTITY, TALLY_BATCHING_MIN_ROWS
fn apply_env_overrides(config: &mut TallyConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("TALLY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("TALLY_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Source overrides
    if let Ok(val) = std::env::var("TALLY_SOURCE_CONNECTION_STRING") {
        config.source.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("TALLY_SOURCE_ID_COLUMN") {
        config.source.id_column = val;
    }

    // Selection overrides
    if let Ok(val) = std::env::var("TALLY_SELECTION_IDENTITY") {
        config.selection.identity = Some(val);
    }
    if let Ok(val) = std::env::var("TALLY_SELECTION_DATE_START") {
        config.selection.date_start = val.parse().map_err(|e| {
            TallyError::Configuration(format!("Invalid TALLY_SELECTION_DATE_START '{val}': {e}"))
        })?;
    }
    if let Ok(val) = std::env::var("TALLY_SELECTION_DATE_END") {
        config.selection.date_end = Some(val.parse().map_err(|e| {
            TallyError::Configuration(format!("Invalid TALLY_SELECTION_DATE_END '{val}': {e}"))
        })?);
    }

    // Batching overrides
    if let Ok(val) = std::env::var("TALLY_BATCHING_MIN_ROWS") {
        if let Ok(rows) = val.parse() {
            config.batching.min_rows = rows;
        }
    }
    if let Ok(val) = std::env::var("TALLY_BATCHING_MAX_ROWS") {
        if let Ok(rows) = val.parse() {
            config.batching.max_rows = rows;
        }
    }
    if let Ok(val) = std::env::var("TALLY_BATCHING_SEED") {
        if let Ok(seed) = val.parse() {
            config.batching.seed = Some(seed);
        }
    }

    // Ledger overrides (only for configured sections)
    if let Some(ref mut file) = config.ledger.file {
        if let Ok(val) = std::env::var("TALLY_LEDGER_FILE_PATH") {
            file.path = val;
        }
    }
    if let Some(ref mut sheets) = config.ledger.sheets {
        if let Ok(val) = std::env::var("TALLY_LEDGER_SHEETS_ACCESS_TOKEN") {
            sheets.access_token = secret_string(val);
        }
        if let Ok(val) = std::env::var("TALLY_LEDGER_SHEETS_SPREADSHEET_ID") {
            sheets.spreadsheet_id = val;
        }
    }

    // Sink overrides
    if let Ok(val) = std::env::var("TALLY_SINK_DESTINATION") {
        config.sink.destination = val;
    }
    if let Ok(val) = std::env::var("TALLY_SINK_STAGING_DIR") {
        config.sink.staging_dir = val;
    }
    if let Ok(val) = std::env::var("TALLY_SINK_FORMAT") {
        config.sink.format = val.parse()?;
    }
    if let Some(ref mut drive) = config.sink.drive {
        if let Ok(val) = std::env::var("TALLY_SINK_DRIVE_ACCESS_TOKEN") {
            drive.access_token = secret_string(val);
        }
    }

    // Commit overrides
    if let Ok(val) = std::env::var("TALLY_COMMIT_POLICY") {
        config.commit.policy = val.parse()?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("TALLY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TALLY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
