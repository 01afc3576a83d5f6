use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AdviceError {
    #[snafu(display("advice endpoint '{endpoint}' is not an http(s) URL"))]
    InvalidEndpoint {
        stage: &'static str,
        endpoint: String,
    },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("advice request failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("advice endpoint returned status {status}: {body}"))]
    Rejected {
        stage: &'static str,
        status: u16,
        body: String,
    },
}

impl AdviceError {
    /// HTTP status of a rejected request, `None` for every other failure.
    pub fn rejected_status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::InvalidEndpoint { .. } | Self::BuildClient { .. } | Self::Transport { .. } => {
                None
            }
        }
    }
}

pub type AdviceResult<T> = Result<T, AdviceError>;
