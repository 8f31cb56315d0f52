use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::info;

use courier_runtime::{init_tracing, JobQueue};
use courier::{demo, Courier};

use super::load_config;

/// Run the job queue.
#[derive(Parser)]
pub struct RunCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "courier.toml")]
    pub config: String,

    /// Enable development mode (verbose logging).
    #[arg(long)]
    pub dev: bool,

    /// Number of demo jobs to enqueue at startup.
    #[arg(long, default_value_t = 0)]
    pub seed: usize,

    /// Target URL for seeded webhook jobs.
    #[arg(long)]
    pub webhook_url: Option<String>,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();

        let (mut config, found) = load_config(&self.config)?;
        if self.dev {
            config.observability.logging.level = "debug".to_string();
        }
        init_tracing(&config.observability.logging)?;

        println!();
        println!(
            "  {}  {} v{}",
            style("📬").bold(),
            style("COURIER").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!();

        if found {
            info!("Loaded configuration from {}", self.config);
        } else {
            info!("No configuration at {}, using defaults", self.config);
        }

        let courier = Courier::builder().config(config).build()?;
        demo::register_handlers(courier.queue(), reqwest::Client::new());

        if self.seed > 0 {
            let seeded = demo::seed_jobs(courier.queue(), self.seed, self.webhook_url.as_deref());
            info!("Seeded {} demo jobs", seeded);
        }

        let reporter = tokio::spawn(report_stats(
            courier.queue().clone(),
            courier.config().queue.poll_interval(),
        ));

        let result = courier.run().await;
        reporter.abort();
        result?;

        println!("  {} Courier stopped", style("👋").bold());
        Ok(())
    }
}

/// Log queue statistics once per poll interval.
async fn report_stats(queue: JobQueue, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let stats = queue.stats();
        info!(
            pending = stats.pending,
            processing = stats.processing,
            failed = stats.failed,
            by_type = ?stats.by_type,
            "Queue stats"
        );
    }
}
