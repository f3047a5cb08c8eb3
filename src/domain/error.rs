//! Domain error types.
//!
//! Every stage of the chart pipeline returns [`ChartError`]. The transport layer
//! decides how to surface it, using [`ChartError::class`] to tell caller-caused
//! failures apart from failures of the service itself.

/// Who is responsible for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The payload or its parameters were unusable.
    Client,
    /// The service failed to produce an image from valid input.
    Server,
}

/// Top-level error type for candlechart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("{reason}")]
    PayloadShape { reason: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("duplicate timestamp in payload: {timestamp}")]
    TimeOrdering { timestamp: String },

    #[error("cannot compute {indicator}: {reason}")]
    Computation { indicator: String, reason: String },

    #[error("render failed: {reason}")]
    Render { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ChartError {
    pub fn payload_shape(reason: impl Into<String>) -> Self {
        ChartError::PayloadShape {
            reason: reason.into(),
        }
    }

    pub fn render(reason: impl Into<String>) -> Self {
        ChartError::Render {
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ChartError::PayloadShape { .. }
            | ChartError::MissingField { .. }
            | ChartError::InvalidField { .. }
            | ChartError::TimeOrdering { .. }
            | ChartError::Computation { .. } => ErrorClass::Client,
            ChartError::Render { .. }
            | ChartError::ConfigParse { .. }
            | ChartError::ConfigInvalid { .. }
            | ChartError::Io(_) => ErrorClass::Server,
        }
    }
}

impl From<&ChartError> for std::process::ExitCode {
    fn from(err: &ChartError) -> Self {
        let code: u8 = match err {
            ChartError::Io(_) => 1,
            ChartError::ConfigParse { .. } | ChartError::ConfigInvalid { .. } => 2,
            ChartError::PayloadShape { .. }
            | ChartError::MissingField { .. }
            | ChartError::InvalidField { .. }
            | ChartError::TimeOrdering { .. } => 3,
            ChartError::Computation { .. } => 4,
            ChartError::Render { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_field() {
        let err = ChartError::MissingField {
            field: "volume".into(),
        };
        assert_eq!(err.to_string(), "missing required field: volume");
    }

    #[test]
    fn payload_shape_message_is_verbatim() {
        let err = ChartError::payload_shape("empty or non-array payload");
        assert_eq!(err.to_string(), "empty or non-array payload");
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let errs = [
            ChartError::payload_shape("x"),
            ChartError::MissingField { field: "open".into() },
            ChartError::TimeOrdering {
                timestamp: "2024-01-01".into(),
            },
            ChartError::Computation {
                indicator: "BANDS(20,2)".into(),
                reason: "window exceeds history".into(),
            },
        ];
        for err in &errs {
            assert_eq!(err.class(), ErrorClass::Client, "{err}");
        }
    }

    #[test]
    fn render_and_io_are_server_errors() {
        assert_eq!(ChartError::render("boom").class(), ErrorClass::Server);
        let io = ChartError::from(std::io::Error::other("disk"));
        assert_eq!(io.class(), ErrorClass::Server);
    }

}
