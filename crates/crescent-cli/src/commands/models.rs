//! `crescent models` — list or delete stored versions.

use crescent_state::ModelInfo;
use serde::Serialize;
use tracing::info;

use super::Context;
use crate::OutputFormat;

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ModelsOutcome {
    Listed { models: Vec<ModelInfo> },
    Deleted { tenant_id: String, deleted: u32 },
}

pub fn run(
    ctx: &Context,
    tenant: Option<&str>,
    delete: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let outcome = execute(ctx, tenant, delete)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => println!("{}", render(&outcome)),
    }
    Ok(())
}

fn execute(ctx: &Context, tenant: Option<&str>, delete: bool) -> anyhow::Result<ModelsOutcome> {
    let store = ctx.open_store()?;
    if !delete {
        return Ok(ModelsOutcome::Listed {
            models: store.list_models(tenant)?,
        });
    }

    let Some(tenant) = tenant else {
        anyhow::bail!("--delete requires --tenant");
    };
    let tenant_id = crescent_state::validate_tenant_id(tenant)?;
    let deleted = store.delete_models(&tenant_id)?;
    info!(tenant = %tenant_id, deleted, "model versions deleted");
    Ok(ModelsOutcome::Deleted { tenant_id, deleted })
}

fn render(outcome: &ModelsOutcome) -> String {
    match outcome {
        ModelsOutcome::Deleted { tenant_id, deleted } => {
            format!("Deleted {deleted} model version(s) for tenant '{tenant_id}'.")
        }
        ModelsOutcome::Listed { models } if models.is_empty() => "No stored models.".to_string(),
        ModelsOutcome::Listed { models } => {
            let mut lines = vec![format!(
                "{:<16} {:<20} {:>8} {:>6}  {}",
                "TENANT", "TRAINED AT", "POINTS", "DAYS", "STATE"
            )];
            for m in models {
                lines.push(format!(
                    "{:<16} {:<20} {:>8} {:>6}  {}",
                    m.tenant_id,
                    m.trained_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    m.stats.total_points,
                    m.stats.days_of_data,
                    if m.trained { "trained" } else { "untrained" }
                ));
            }
            lines.join("\n")
        }
    }
}
