use std::fmt;

use formats::DecodeError;

/// Why a model could not be acquired.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// The API rejected the credentials (401/403).
    Auth { status: u16 },
    NotFound,
    Transport(String),
    /// The asset exists but only in a format the viewer cannot load.
    UnsupportedFormat(String),
    AssetDecode(String),
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::Auth { status } => {
                write!(f, "Error: {status} - invalid or insufficient API token")
            }
            AcquisitionError::NotFound => write!(f, "Error: 404 - model not found"),
            AcquisitionError::Transport(msg) => f.write_str(msg),
            AcquisitionError::UnsupportedFormat(msg) => f.write_str(msg),
            AcquisitionError::AssetDecode(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for AcquisitionError {}

impl From<DecodeError> for AcquisitionError {
    fn from(value: DecodeError) -> Self {
        if value.is_unsupported_format() {
            AcquisitionError::UnsupportedFormat(value.to_string())
        } else {
            AcquisitionError::AssetDecode(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AcquisitionError;
    use formats::DecodeError;

    #[test]
    fn decode_errors_split_by_cause() {
        assert!(matches!(
            AcquisitionError::from(DecodeError::UnsupportedContainer("zip")),
            AcquisitionError::UnsupportedFormat(_)
        ));
        assert!(matches!(
            AcquisitionError::from(DecodeError::Container("truncated".to_string())),
            AcquisitionError::AssetDecode(_)
        ));
        assert_eq!(
            AcquisitionError::Auth { status: 403 }.to_string(),
            "Error: 403 - invalid or insufficient API token"
        );
    }
}
