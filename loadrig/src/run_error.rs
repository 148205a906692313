use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    SetupFailed(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::SetupFailed(_) => ExitCode::SetupFailed,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::SetupFailed(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl From<loadrig_core::Error> for RunError {
    fn from(err: loadrig_core::Error) -> Self {
        if err.is_setup() {
            Self::SetupFailed(err.into())
        } else {
            Self::InvalidInput(err.into())
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(e) | Self::SetupFailed(e) | Self::RuntimeError(e) => {
                write!(f, "{e:#}")
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let setup = RunError::from(loadrig_core::Error::Setup {
            step: "register_sender".to_string(),
            detail: "call failed: connect: refused".to_string(),
        });
        assert_eq!(setup.exit_code(), ExitCode::SetupFailed);
        assert_eq!(
            setup.to_string(),
            "setup failed at step `register_sender`: call failed: connect: refused"
        );

        let config = RunError::from(loadrig_core::Error::Config(
            loadrig_core::ConfigError::InvalidVus,
        ));
        assert_eq!(config.exit_code(), ExitCode::InvalidInput);
    }
}
