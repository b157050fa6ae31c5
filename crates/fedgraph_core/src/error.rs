use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shape error: {message}")]
    Shape { message: String },
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl StoreError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn is_shape(&self) -> bool {
        matches!(self, StoreError::Shape { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, StoreError::Configuration { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = StoreError::shape("width");
        assert!(matches!(err, StoreError::Shape { .. }));
        assert!(err.is_shape());
        let err = StoreError::configuration("schema");
        assert!(matches!(err, StoreError::Configuration { .. }));
        assert!(err.is_configuration());
        let err = StoreError::storage("disk");
        assert!(matches!(err, StoreError::Storage { .. }));
        assert!(!err.is_shape());
    }

    #[test]
    fn display_carries_message() {
        let err = StoreError::shape("row has 2 values, pdus declares 10 fields");
        assert_eq!(
            err.to_string(),
            "shape error: row has 2 values, pdus declares 10 fields"
        );
    }
}
