use std::path::PathBuf;

/// Default workbook looked up in the working directory.
pub const DEFAULT_FILE: &str = "Kitchen_PNL_Data1.xlsx";

pub const ENV_FILE: &str = "KITCHEN_PNL_FILE";
pub const ENV_HEADER_ROW: &str = "KITCHEN_PNL_HEADER_ROW";
pub const ENV_SHEET: &str = "KITCHEN_PNL_SHEET";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid header row '{0}': expected a non-negative integer")]
    InvalidHeaderRow(String),

    #[error("missing value for {0}")]
    MissingValue(&'static str),

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
}

// ---------------------------------------------------------------------------
// Load parameters
// ---------------------------------------------------------------------------

/// Where the P&L table comes from.  Also the cache key for loaded tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadConfig {
    pub path: PathBuf,
    /// Zero-based row holding the column names (grid formats only).
    pub header_row: usize,
    /// Worksheet name; the first sheet when `None`.
    pub sheet: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE),
            header_row: 0,
            sheet: None,
        }
    }
}

impl LoadConfig {
    /// Resolve from the process environment and command line.
    pub fn from_env_and_args() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        Self::resolve(env, std::env::args().skip(1))
    }

    /// Defaults, overridden by environment variables, overridden by
    /// arguments: `[PATH] [--header-row N] [--sheet NAME]`.
    pub fn resolve<E, I>(env: E, args: I) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();

        if let Some(path) = env(ENV_FILE) {
            config.path = PathBuf::from(path);
        }
        if let Some(row) = env(ENV_HEADER_ROW) {
            config.header_row = parse_header_row(&row)?;
        }
        if let Some(sheet) = env(ENV_SHEET) {
            config.sheet = Some(sheet);
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--header-row" => {
                    let value = args.next().ok_or(ConfigError::MissingValue("--header-row"))?;
                    config.header_row = parse_header_row(&value)?;
                }
                "--sheet" => {
                    config.sheet = Some(args.next().ok_or(ConfigError::MissingValue("--sheet"))?);
                }
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownArgument(flag.to_string()));
                }
                path => config.path = PathBuf::from(path),
            }
        }

        Ok(config)
    }

    /// Same source, different header row.
    pub fn with_header_row(&self, header_row: usize) -> Self {
        Self {
            header_row,
            ..self.clone()
        }
    }
}

fn parse_header_row(s: &str) -> Result<usize, ConfigError> {
    s.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidHeaderRow(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_input() {
        let cfg = LoadConfig::resolve(no_env, args(&[])).unwrap();
        assert_eq!(cfg, LoadConfig::default());
        assert_eq!(cfg.path, PathBuf::from("Kitchen_PNL_Data1.xlsx"));
        assert_eq!(cfg.header_row, 0);
    }

    #[test]
    fn args_override_env() {
        let env = |key: &str| match key {
            ENV_FILE => Some("from_env.xlsx".to_string()),
            ENV_HEADER_ROW => Some("1".to_string()),
            _ => None,
        };
        let cfg = LoadConfig::resolve(env, args(&[])).unwrap();
        assert_eq!(cfg.path, PathBuf::from("from_env.xlsx"));
        assert_eq!(cfg.header_row, 1);

        let cfg =
            LoadConfig::resolve(env, args(&["other.csv", "--header-row", "0", "--sheet", "P&L"]))
                .unwrap();
        assert_eq!(cfg.path, PathBuf::from("other.csv"));
        assert_eq!(cfg.header_row, 0);
        assert_eq!(cfg.sheet.as_deref(), Some("P&L"));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            LoadConfig::resolve(no_env, args(&["--header-row", "-1"])),
            Err(ConfigError::InvalidHeaderRow("-1".into()))
        );
        assert_eq!(
            LoadConfig::resolve(no_env, args(&["--header-row"])),
            Err(ConfigError::MissingValue("--header-row"))
        );
        assert_eq!(
            LoadConfig::resolve(no_env, args(&["--verbose"])),
            Err(ConfigError::UnknownArgument("--verbose".into()))
        );
    }
}
