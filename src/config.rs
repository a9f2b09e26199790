use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use confique::Config as _;
use serde::Deserialize;

use crate::prelude::*;


/// The locations where we will look for a configuration file. The first
/// existing file in this list is used. If none exists, the defaults are used.
const DEFAULT_PATHS: &[&str] = &[
    "config.toml",
    "/etc/bookshelf/config.toml",
];

const CONFIG_PATH_ENV: &str = "BOOKSHELF_CONFIG_PATH";

/// Configuration for the bookshelf server.
///
/// All relative paths are relative to the location of this configuration file.
/// Duration values are specified as string with a unit, e.g. "27s". Valid
/// units: 'ms', 's', 'min', 'h' and 'd'.
#[derive(Debug, confique::Config)]
pub(crate) struct Config {
    #[config(nested)]
    pub(crate) http: crate::http::HttpConfig,

    #[config(nested)]
    pub(crate) log: crate::logger::LogConfig,

    #[config(nested)]
    pub(crate) store: crate::store::StoreConfig,
}

impl Config {
    /// Tries to find a config file by checking `BOOKSHELF_CONFIG_PATH` and a
    /// list of possible default config file locations. The first config file
    /// is loaded via [`Self::load_from`]. Returns the loaded config and the
    /// path that it was loaded from, or the default config and `None` if no
    /// file was found.
    pub(crate) fn from_env_or_default_locations() -> Result<(Self, Option<PathBuf>)> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => DEFAULT_PATHS.iter().map(PathBuf::from).find(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let config = Self::load_from(&path)
                    .context(format!("failed to load configuration from '{}'", path.display()))?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::load_defaults()?, None)),
        }
    }

    /// Loads the configuration from a specific TOML file.
    pub(crate) fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Config::from_file(path)
            .context(format!("failed to read config file '{}'", path.display()))?;

        config.fix_paths(path)?;
        config.validate()?;

        Ok(config)
    }

    /// Returns the configuration with all values set to their defaults.
    pub(crate) fn load_defaults() -> Result<Self> {
        let config = Config::builder().load().context("failed to load default configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that are syntactically fine, but still unusable.
    pub(crate) fn validate(&self) -> Result<()> {
        self.http.validate().context("invalid 'http' configuration")?;
        Ok(())
    }

    /// Goes through all paths in the configuration and changes relative paths
    /// to be absolute based on the path of the configuration file itself.
    fn fix_paths(&mut self, config_path: &Path) -> Result<()> {
        let absolute_config_path = config_path.canonicalize()
            .context("failed to canonicalize config path")?;
        let base = absolute_config_path.parent()
            .ok_or_else(|| anyhow!("config file path has no parent"))?;

        if let Some(p) = &mut self.log.file {
            if p.is_relative() {
                *p = base.join(&p);
            }
        }

        Ok(())
    }
}

/// Writes the generated TOML config template file to the given destination or
/// stdout.
pub(crate) fn write_template(path: Option<&PathBuf>) -> Result<()> {
    use confique::toml::FormatOptions;

    info!(
        "Writing configuration template to '{}'",
        path.map(|p| p.display().to_string()).unwrap_or("<stdout>".into()),
    );

    let mut options = FormatOptions::default();
    options.general.nested_field_gap = 2;
    let template = confique::toml::template::<Config>(options);
    match path {
        Some(path) => fs::write(path, template)?,
        None => io::stdout().write_all(template.as_bytes())?,
    }

    Ok(())
}

/// Our custom format for durations. We allow a couple useful units and required
/// a unit to increase readability of config files.
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(D::Error::custom)
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Allow unit-less zeroes
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let start_unit = s.find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| "no time unit for duration".to_string())?;
    let (num, unit) = s.split_at(start_unit);
    let num: u64 = num.parse::<u32>()
        .map_err(|e| format!("invalid integer for duration: {e}"))?
        .into();

    match unit {
        "ms" => Ok(Duration::from_millis(num)),
        "s" => Ok(Duration::from_secs(num)),
        "min" => Ok(Duration::from_secs(num * 60)),
        "h" => Ok(Duration::from_secs(num * 60 * 60)),
        "d" => Ok(Duration::from_secs(num * 60 * 60 * 24)),
        _ => Err(format!("invalid unit of time for duration: '{unit}'")),
    }
}


#[cfg(test)]
mod tests {
    use std::{net::{IpAddr, Ipv4Addr}, time::Duration};

    use super::{Config, parse_duration};


    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("27s"), Ok(Duration::from_secs(27)));
        assert_eq!(parse_duration("3min"), Ok(Duration::from_secs(180)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1d"), Ok(Duration::from_secs(86400)));
    }

    #[test]
    fn duration_errors() {
        for s in ["", "10", "s", "5 s", "5sec", "-5s", "99999999999s"] {
            assert!(parse_duration(s).is_err(), "'{s}' should not parse");
        }
    }

    #[test]
    fn defaults() {
        let config = Config::load_defaults().unwrap();
        assert_eq!(config.http.port, 4000);
        assert_eq!(config.http.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.http.graphql_path, "/graphql");
        assert_eq!(config.http.subscriptions_path, "/graphql");
        assert_eq!(config.http.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.http.ws_keep_alive_interval, Duration::from_secs(15));
        assert!(config.store.seed_sample_data);
        assert!(config.log.stdout);
        assert!(config.log.file.is_none());
    }

    #[test]
    fn template_mentions_all_sections() {
        let template = confique::toml::template::<Config>(Default::default());
        for section in ["[http]", "[log]", "[store]", "port", "seed_sample_data"] {
            assert!(template.contains(section), "template misses '{section}'");
        }
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join(format!("bookshelf-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "\
            [http]\n\
            port = 8080\n\
            subscriptions_path = \"/subscriptions\"\n\
            shutdown_timeout = \"2s\"\n\
            \n\
            [log]\n\
            file = \"bookshelf.log\"\n\
            \n\
            [store]\n\
            seed_sample_data = false\n\
        ").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.graphql_path, "/graphql");
        assert_eq!(config.http.subscriptions_path, "/subscriptions");
        assert_eq!(config.http.shutdown_timeout, Duration::from_secs(2));
        assert!(!config.store.seed_sample_data);

        // Relative paths are resolved against the config file.
        let log_file = config.log.file.unwrap();
        assert!(log_file.is_absolute());
        assert!(log_file.ends_with("bookshelf.log"));

        std::fs::write(&path, "[http]\ngraphql_path = \"graphql\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
