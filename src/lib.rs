#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

use std::path::PathBuf;

use envconfig::Envconfig;

pub mod data;
mod handlers;
mod server;

pub use server::run_server;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "CHOMBO_ENV", default = "dev")]
    pub env: String,

    #[envconfig(from = "CHOMBO_DB_PATH", default = "var/chombo.sqlite")]
    pub db_path: PathBuf,

    #[envconfig(from = "CHOMBO_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "CHOMBO_PORT", default = "8000")]
    pub port: u16,
}

impl Config {
    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }
}

pub struct AppState {
    pub config: Config,
    pub db: data::DbConn,
}

pub fn init_env() -> anyhow::Result<Config> {
    pretty_env_logger::init_timed();
    let config = Config::init_from_env()?;
    Ok(config)
}
