use std::fmt;
use std::io;
use std::str::FromStr;

/// Environment variable selecting the runtime environment.
pub const APP_ENVIRONMENT: &str = "APP_ENVIRONMENT";

/// Runtime environment the application is configured for.
///
/// Selects which configuration file overlays the base settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Development environment.
    Dev,
    /// Production environment.
    Prod,
}

impl Environment {
    /// Reads the environment from `APP_ENVIRONMENT`, defaulting to
    /// [`Environment::Dev`] when the variable is unset.
    pub fn load() -> Result<Self, io::Error> {
        match std::env::var(APP_ENVIRONMENT) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::Dev),
        }
    }

    /// Returns the lowercase name of the environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(io::Error::other(format!(
                "`{other}` is not a supported environment, use `dev` or `prod`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("staging".parse::<Environment>().is_err());
    }
}
