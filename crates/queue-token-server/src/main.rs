//! Server implementation

#![warn(missing_docs)]

mod http;
mod settings;

use std::path::PathBuf;
use std::thread;

use clap::Parser;
use eyre::{eyre, Result};
use queue_token_core::{Config, RequestHandler};
use settings::Settings;
use tracing_subscriber::EnvFilter;

/// Command line options
#[derive(Debug, Parser)]
#[command(name = "queue-token-server", about = "Serve the queue token desk over HTTP")]
struct Opts {
    /// Port for the HTTP server to listen on
    #[arg(long, default_value_t = 8585)]
    port: u16,
    /// Host for the HTTP server to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Number of worker threads
    #[arg(long, default_value_t = 16)]
    threads: u32,

    /// Settings file (defaults to the nearest `queue.toml`)
    #[arg(long, env = "QUEUE_CONFIG")]
    config: Option<PathBuf>,
    /// Key staff requests must present, overrides the settings file
    #[arg(long, env = "QUEUE_STAFF_KEY")]
    staff_key: Option<String>,
    /// Long-poll window for change requests in seconds, overrides the
    /// settings file
    #[arg(long)]
    change_timeout: Option<u32>,
}

impl Opts {
    /// Merge the options into the settings file
    fn desk_config(&self, settings: Settings) -> Config {
        Config {
            services: settings.services,
            staff_key: self.staff_key.clone().or(settings.staff_key),
            change_timeout: self.change_timeout.unwrap_or(settings.change_timeout),
        }
    }
}

fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H) {
    loop {
        match server.recv() {
            Ok(rq) => {
                if let Some(rq) = http::parse(rq) {
                    handler.handle(rq);
                }
            }
            Err(err) => tracing::error!(%err, "HTTP receive failed"),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let settings = Settings::load(opts.config.as_deref())?;
    match &settings.source {
        Some(path) => tracing::info!(path = %path.display(), "settings loaded"),
        None => tracing::warn!("no queue.toml found, starting without services"),
    }

    let config = opts.desk_config(settings);
    if config.staff_key.is_none() {
        tracing::warn!("no staff key configured, staff requests are open");
    }

    let desk = queue_token_desk::launch(&config)?;
    let server = tiny_http::Server::http((opts.host.as_str(), opts.port))
        .map_err(|err| eyre!("could not listen on {}:{}: {err}", opts.host, opts.port))?;
    tracing::info!(host = %opts.host, port = opts.port, threads = opts.threads, "listening");

    thread::scope(|s| -> Result<()> {
        for i in 0..opts.threads {
            thread::Builder::new()
                .name(format!("worker_{i}"))
                .spawn_scoped(s, || http_loop(&server, &desk))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use queue_token_core::ServiceSeed;

    use super::*;

    fn settings() -> Settings {
        Settings {
            staff_key: Some("from-file".to_owned()),
            change_timeout: 10,
            services: vec![ServiceSeed::new("Pharmacy")],
            ..Settings::default()
        }
    }

    #[test]
    fn test_file_values_without_options() {
        let opts = Opts::try_parse_from(["queue-token-server"]).unwrap();
        assert_eq!(opts.port, 8585);
        assert_eq!(opts.host, "127.0.0.1");

        let config = opts.desk_config(settings());
        assert_eq!(config.staff_key.as_deref(), Some("from-file"));
        assert_eq!(config.change_timeout, 10);
        assert_eq!(config.services, [ServiceSeed::new("Pharmacy")]);
    }

    #[test]
    fn test_options_override_file() {
        let opts = Opts::try_parse_from([
            "queue-token-server",
            "--staff-key",
            "from-cli",
            "--change-timeout",
            "2",
        ])
        .unwrap();

        let config = opts.desk_config(settings());
        assert_eq!(config.staff_key.as_deref(), Some("from-cli"));
        assert_eq!(config.change_timeout, 2);
        assert_eq!(config.services.len(), 1);
    }
}
