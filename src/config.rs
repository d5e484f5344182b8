use std::path::PathBuf;

pub const APP_NAME: &str = "bnauth";

#[derive(clap::Parser, Debug, Clone)]
#[command(name = APP_NAME, version, about = "Store authenticator secrets and display their tokens")]
pub struct Config {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Directory holding serials.toml. Defaults to the per-user config directory.
    #[arg(long, env = "BNAUTH_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Store an existing authenticator from its serial and hex secret.
    Import {
        serial: String,
        secret: String,
        #[arg(short, long)]
        region: Option<String>,
        /// Make this authenticator the default.
        #[arg(long)]
        set_default: bool,
    },
    /// Print the current token for SERIAL, or for the default authenticator.
    Show {
        serial: Option<String>,
        /// Keep refreshing the token until interrupted.
        #[arg(short, long)]
        update: bool,
        /// Also make SERIAL the default.
        #[arg(long)]
        set_default: bool,
    },
    /// Make a stored authenticator the default.
    Default { serial: String },
    /// List stored authenticators.
    List,
    /// Delete a stored authenticator.
    Remove { serial: String },
}

impl Config {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn config_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.config_dir {
            return Ok(dir.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", APP_NAME)
            .ok_or_else(|| anyhow::anyhow!("cannot determine config directory"))?;
        Ok(dirs.config_dir().to_path_buf())
    }

    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.config_dir()?.join(crate::store::STORE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_show_live() {
        let cfg = Config::try_parse_from(["bnauth", "-vv", "show", "us-1006-0469-3849", "-u"]).unwrap();
        assert_eq!(cfg.log_level(), "debug");
        match cfg.command {
            Command::Show { serial, update, set_default } => {
                assert_eq!(serial.as_deref(), Some("us-1006-0469-3849"));
                assert!(update);
                assert!(!set_default);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_dir_override() {
        let cfg = Config::try_parse_from(["bnauth", "--config-dir", "/tmp/bna", "list"]).unwrap();
        assert_eq!(cfg.store_path().unwrap(), PathBuf::from("/tmp/bna/serials.toml"));
    }
}
