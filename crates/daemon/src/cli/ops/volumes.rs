use clap::Args;

use files_daemon::state::StateError;

/// List configured volumes
#[derive(Args, Debug, Clone)]
pub struct Volumes;

#[async_trait::async_trait]
impl crate::cli::op::Op for Volumes {
    type Error = StateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let registry = ctx.config()?.registry()?;

        let lines: Vec<String> = registry
            .iter()
            .map(|volume| {
                let mut features: Vec<&str> = volume.features().collect();
                features.sort_unstable();
                format!(
                    "{:<16} {:<9} {:<24} {}",
                    volume.name(),
                    volume.privacy().as_str(),
                    features.join(","),
                    volume.root().display()
                )
            })
            .collect();

        if lines.is_empty() {
            return Ok("no volumes configured".to_string());
        }
        Ok(lines.join("\n"))
    }
}
