pub type InkstepResult<T> = Result<T, InkstepError>;

#[derive(thiserror::Error, Debug)]
pub enum InkstepError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InkstepError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            InkstepError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            InkstepError::decode("x")
                .to_string()
                .contains("decode error:")
        );
        assert!(
            InkstepError::render("x")
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = InkstepError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
