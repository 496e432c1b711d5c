//! `ragq health`: check that the answering service is up.

use anyhow::{bail, Result};

use crate::client::HttpAnswerService;
use crate::config::Config;
use crate::models::HealthStatus;

const HEALTHY: &str = "healthy";

/// Prints the endpoint and its reported status. Fails unless the service
/// reports itself healthy, so the exit code is usable from scripts.
pub async fn run_health(config: &Config) -> Result<()> {
    let service = HttpAnswerService::new(&config.endpoint)?;
    let health = service.health().await?;

    println!("{:<40} STATUS", "ENDPOINT");
    println!("{:<40} {}", service.base_url(), health.status);

    check_status(service.base_url(), &health)
}

fn check_status(base_url: &str, health: &HealthStatus) -> Result<()> {
    if health.status != HEALTHY {
        bail!("service at {} reported status '{}'", base_url, health.status);
    }
    Ok(())
}
