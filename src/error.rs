use thiserror::Error;

/// Everything that can go wrong between loading the survey workbook and
/// handing an exported view back to the operator.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// A filter or recoding step named a column the dataset does not have.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A support filter named a column that is not configured as support.
    #[error("column '{0}' is not a support column")]
    NotSupportColumn(String),

    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("sheet '{0}' has no header row")]
    EmptySheet(String),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("failed to write workbook: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[cfg(feature = "web")]
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[cfg(feature = "web")]
    #[error("template error: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("invalid password hash: {0}")]
    PasswordHash(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
