use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse json config file: {0}")]
    ConfigJsonError(#[from] serde_json::Error),
    #[error("unable to parse yaml config file: {0}")]
    ConfigYamlError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tuya(#[from] tuyaapi::TuyaError),

    #[error("unable to write csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("config file watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
