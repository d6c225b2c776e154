use std::process::ExitCode;
use tracing::{debug, info, warn};

use iterdns::cli::{self, Mode};
use iterdns::config::Config;
use iterdns::iterative::IterativeResolver;
use iterdns::journey::Journey;
use iterdns::recursive::recursive_lookup;
use iterdns::stub::StubResolver;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Diagnostics go to stderr; stdout carries the progress lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iterdns=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let invocation = match cli::parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            debug!("Bad invocation: {}", e);
            println!("{}", cli::USAGE);
            return Ok(ExitCode::from(1));
        }
    };

    let config = Config::default();
    info!("iterdns v{} {} {}", env!("CARGO_PKG_VERSION"), invocation.mode, invocation.domain);

    let mut journey = Journey::new(&invocation.domain, true);

    match invocation.mode {
        Mode::Iterative => {
            let resolver = IterativeResolver::from_config(&config);
            match resolver.resolve(&invocation.domain, &mut journey).await {
                Ok(resolution) => info!(
                    "{} resolved at {} ({} queries, {} referrals)",
                    invocation.domain, resolution.stage, resolution.queries, resolution.referrals
                ),
                Err(e) => warn!("{} did not resolve: {}", invocation.domain, e),
            }
        }
        Mode::Recursive => {
            let resolver = StubResolver::from_config(&config);
            let report = recursive_lookup(&invocation.domain, &resolver, &mut journey).await;
            if !report.is_success() {
                warn!("{} did not resolve recursively", invocation.domain);
            }
        }
    }

    println!("Time taken: {:.3} seconds", journey.elapsed().as_secs_f64());
    Ok(ExitCode::SUCCESS)
}
