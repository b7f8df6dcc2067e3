use thiserror::Error;

#[derive(Error, Debug)]
pub enum FidesError {
    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("Vendor error: {0}")]
    Vendor(String),

    #[error("Vendor API returned status {status}: {body}")]
    VendorStatus { status: u16, body: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FidesError>;
