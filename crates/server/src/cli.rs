//! Command-line interface, grounded on `burka-voicsh`'s `Cli` struct: a
//! `clap` derive struct with global flags and no subcommands, since this
//! binary only ever does one thing (run the server).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "live-transcripts-server", version, about = "Real-time transcription pipeline server")]
pub struct Cli {
    /// Path to a TOML configuration file. Defaults cover a zero-config run
    /// if omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overrides `server.server_host` from the config file.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Overrides `server.server_port` from the config file.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Log level passed to `tracing_subscriber::EnvFilter` (e.g. `debug`,
    /// `live_transcripts_hub=trace,info`). Overrides `RUST_LOG` if set.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_no_arguments() {
        let cli = Cli::try_parse_from(["live-transcripts-server"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn parses_config_path() {
        let cli = Cli::try_parse_from(["live-transcripts-server", "--config", "/tmp/lt.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lt.toml")));
    }

    #[test]
    fn parses_host_and_port_overrides() {
        let cli = Cli::try_parse_from([
            "live-transcripts-server",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(9000));
    }

    #[test]
    fn parses_log_level() {
        let cli = Cli::try_parse_from(["live-transcripts-server", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn rejects_unknown_flags() {
        let result = Cli::try_parse_from(["live-transcripts-server", "--bogus"]);
        assert!(result.is_err());
    }
}
