use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Type grammar error: {message} (at '{fragment}')")]
    TypeGrammar { message: String, fragment: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Enum lookup error: {0}")]
    EnumLookup(String),

    #[error("Value {value} does not fit into {type_name}")]
    EncodingOverflow { type_name: String, value: String },

    #[error("Decoding error: {0}")]
    DecodingFormat(String),

    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Decimal overflow: {0}")]
    DecimalOverflow(String),

    #[error("Integer overflow: {0}")]
    IntegerOverflow(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn grammar(
        message: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Error::TypeGrammar {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    pub(crate) fn overflow(
        type_name: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Error::EncodingOverflow {
            type_name: type_name.into(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
