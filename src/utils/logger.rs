use crate::errors::prelude::*;

use env_logger::Builder as EnvLoggerBuilder;
use log::LevelFilter;

use std::env;
use std::io::Write;

pub struct ClCryptoDefaultLogger;

impl ClCryptoDefaultLogger {
    /// Installs an `env_logger` backed logger. `pattern` uses the `RUST_LOG` syntax and
    /// falls back to the `RUST_LOG` environment variable.
    pub fn init(pattern: Option<String>) -> ClCryptoResult<()> {
        let pattern = pattern.or_else(|| env::var("RUST_LOG").ok());

        let mut builder = EnvLoggerBuilder::new();
        builder
            .format(|buf, record| {
                writeln!(buf, "{:>5}|{:<30}|{:>35}:{:<4}| {}",
                         record.level(),
                         record.target(),
                         record.file().unwrap_or(""),
                         record.line().unwrap_or(0),
                         record.args())
            })
            .filter(None, LevelFilter::Off);

        if let Some(pattern) = pattern {
            builder.parse_filters(&pattern);
        }

        builder.try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_reported() {
        let _ = ClCryptoDefaultLogger::init(Some("cl_crypto=trace".to_string()));
        let err = ClCryptoDefaultLogger::init(None).unwrap_err();
        assert_eq!(ClCryptoErrorKind::InvalidState, err.kind());
    }
}
