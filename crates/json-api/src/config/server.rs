//! Server Config

use std::time::Duration;

use clap::Args;

/// Listener address and shutdown behaviour.
#[derive(Debug, Args)]
pub struct ServerRuntimeConfig {
    /// Interface to bind
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds in-flight requests get to finish after a shutdown signal;
    /// zero waits indefinitely
    #[arg(long, env = "SERVER_SHUTDOWN_GRACE_SECS", default_value_t = 30)]
    pub shutdown_grace_secs: u64,
}

impl ServerRuntimeConfig {
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` when shutdown should wait for every request.
    #[must_use]
    pub fn shutdown_grace(&self) -> Option<Duration> {
        (self.shutdown_grace_secs > 0).then(|| Duration::from_secs(self.shutdown_grace_secs))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        server: ServerRuntimeConfig,
    }

    #[test]
    fn zero_grace_waits_for_every_request() -> testresult::TestResult {
        let harness = Harness::try_parse_from(["test", "--shutdown-grace-secs", "0"])?;

        assert_eq!(harness.server.shutdown_grace(), None);

        let harness = Harness::try_parse_from(["test", "--port", "9000"])?;

        assert_eq!(harness.server.socket_addr(), "0.0.0.0:9000");
        assert_eq!(
            harness.server.shutdown_grace(),
            Some(Duration::from_secs(30))
        );

        Ok(())
    }
}
