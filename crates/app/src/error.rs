use std::net::SocketAddr;

use farm_helper_advice::AdviceError;
use snafu::Snafu;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("failed to set up advice client on `{stage}`: {source}"))]
    AdviceClient {
        stage: &'static str,
        source: AdviceError,
    },
    #[snafu(display("callback address '{addr}' is invalid: {source}"))]
    CallbackAddr {
        stage: &'static str,
        addr: String,
        source: std::net::AddrParseError,
    },
    #[snafu(display("failed to bind callback endpoint on {addr}: {source}"))]
    BindCallback {
        stage: &'static str,
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[snafu(display("callback endpoint failed on `{stage}`: {source}"))]
    ServeCallback {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to save settings on `{stage}`: {source}"))]
    SaveSettings {
        stage: &'static str,
        source: SettingsError,
    },
}

pub type AppResult<T> = Result<T, AppError>;
