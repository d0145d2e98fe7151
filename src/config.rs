use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_JOB_NAME: &str = "hud_housing";

/// Run configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub state_dir: PathBuf,
    pub job_name: String,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub run_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            state_dir: PathBuf::from("data/state"),
            job_name: DEFAULT_JOB_NAME.to_string(),
            fetch_timeout: Duration::from_secs(120),
            user_agent: concat!("hudscraper/", env!("CARGO_PKG_VERSION")).to_string(),
            run_id: "local-run".to_string(),
        }
    }
}

/// Everything optional; unset keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    state_dir: Option<PathBuf>,
    job_name: Option<String>,
    fetch_timeout_secs: Option<u64>,
    user_agent: Option<String>,
    run_id: Option<String>,
}

impl Config {
    /// Defaults, then the YAML file (if given), then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = path {
            let text =
                fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
            cfg.apply_yaml(&text)
                .with_context(|| format!("parsing config {:?}", path))?;
        }
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    fn apply_yaml(&mut self, text: &str) -> Result<()> {
        let file: ConfigFile = serde_yaml::from_str(text)?;
        if let Some(d) = file.data_dir {
            // state follows data unless pinned separately
            if file.state_dir.is_none() {
                self.state_dir = d.join("state");
            }
            self.data_dir = d;
        }
        if let Some(d) = file.state_dir {
            self.state_dir = d;
        }
        if let Some(d) = file.output_dir {
            self.output_dir = d;
        }
        if let Some(j) = file.job_name {
            self.job_name = j;
        }
        if let Some(s) = file.fetch_timeout_secs {
            self.fetch_timeout = Duration::from_secs(s);
        }
        if let Some(ua) = file.user_agent {
            self.user_agent = ua;
        }
        if let Some(r) = file.run_id {
            self.run_id = r;
        }
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(d) = var("HUD_DATA_DIR") {
            // a state_dir pinned in the file stays put
            let follows_data = self.state_dir == self.data_dir.join("state");
            self.data_dir = PathBuf::from(d);
            if follows_data {
                self.state_dir = self.data_dir.join("state");
            }
        }
        if let Some(d) = var("HUD_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(d);
        }
        if let Some(s) = var("HUD_FETCH_TIMEOUT_SECS") {
            let secs: u64 = s
                .trim()
                .parse()
                .with_context(|| format!("HUD_FETCH_TIMEOUT_SECS={:?} is not a number", s))?;
            self.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(ua) = var("HUD_USER_AGENT") {
            self.user_agent = ua;
        }
        if let Some(r) = var("RUN_ID") {
            self.run_id = r;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.job_name, "hud_housing");
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(120));
        assert_eq!(cfg.run_id, "local-run");
        assert_eq!(cfg.raw_dir(), PathBuf::from("data/raw"));
    }

    #[test]
    fn yaml_then_env() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("hud.yaml");
        fs::write(
            &path,
            "data_dir: /srv/hud\nfetch_timeout_secs: 30\nrun_id: nightly\n",
        )?;
        let mut cfg = Config::default();
        cfg.apply_yaml(&fs::read_to_string(&path)?)?;
        assert_eq!(cfg.state_dir, PathBuf::from("/srv/hud/state"));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));

        let env: HashMap<&str, &str> =
            [("HUD_OUTPUT_DIR", "/out"), ("RUN_ID", "ci-42")].into_iter().collect();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()))?;
        assert_eq!(cfg.output_dir, PathBuf::from("/out"));
        assert_eq!(cfg.run_id, "ci-42");
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/hud"));
        Ok(())
    }

    #[test]
    fn env_data_dir_keeps_pinned_state_dir() -> Result<()> {
        let env = |k: &str| (k == "HUD_DATA_DIR").then(|| "/tmp/hud".to_string());

        let mut pinned = Config::default();
        pinned.apply_yaml("state_dir: /var/lib/hud-state\n")?;
        pinned.apply_env(env)?;
        assert_eq!(pinned.data_dir, PathBuf::from("/tmp/hud"));
        assert_eq!(pinned.state_dir, PathBuf::from("/var/lib/hud-state"));

        let mut derived = Config::default();
        derived.apply_yaml("data_dir: /srv/hud\n")?;
        derived.apply_env(env)?;
        assert_eq!(derived.state_dir, PathBuf::from("/tmp/hud/state"));
        Ok(())
    }

    #[test]
    fn rejects_bad_timeout_and_unknown_keys() {
        let mut cfg = Config::default();
        assert!(cfg
            .apply_env(|k| (k == "HUD_FETCH_TIMEOUT_SECS").then(|| "soon".to_string()))
            .is_err());
        assert!(cfg.apply_yaml("data_dirr: x\n").is_err());
    }
}
