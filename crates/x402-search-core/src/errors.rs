/// Failures encoding or decoding the base64 JSON carried in x402 headers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Header is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Header is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Header is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
