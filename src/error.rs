use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes surfaced at the command boundary. None of these are
/// retried automatically; each is logged and terminal for that one operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorType {
    /// The dataset resource was unreachable or unparsable as tabular data.
    Load,
    /// Sign-in, sign-out, or token refresh failed.
    Auth,
    /// The vote record or counter write failed; the vote may be retried.
    VoteWrite,
    /// The data directory or config file is missing or invalid.
    Config,
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorType::Load => "dataset load error",
            ErrorType::Auth => "auth error",
            ErrorType::VoteWrite => "vote write error",
            ErrorType::Config => "config error",
        };
        write!(f, "{s}")
    }
}

/// Tags an error with its `ErrorType` as outermost context.
pub(crate) trait IntoResult<T> {
    fn classify(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn classify(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| e.into().context(error_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_classify_adds_context() {
        let result: Result<()> = Err(anyhow!("connection refused")).classify(ErrorType::VoteWrite);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("vote write error"));
        assert!(message.contains("connection refused"));
    }
}
