//! # Entities Subcommand
//!
//! `spvtax entities [--json]` lists the SPVs the entity source offers.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use spvtax_engine::mock::MockEntitySource;
use spvtax_engine::{Clock, EntitySource, EntitySummary};

/// Arguments for `spvtax entities`.
#[derive(Args, Debug)]
pub struct EntitiesArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Execute the entities subcommand.
pub async fn run_entities(args: &EntitiesArgs, clock: Arc<dyn Clock>) -> Result<u8> {
    let source = MockEntitySource::new(clock);
    let entities = source
        .list_candidate_entities()
        .await
        .context("listing candidate entities")?;
    tracing::debug!(count = entities.len(), "entities listed");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entities)?);
    } else {
        print!("{}", render_table(&entities));
    }
    Ok(0)
}

fn render_table(entities: &[EntitySummary]) -> String {
    let mut out = format!("{:<10} {}\n", "ID", "NAME");
    for e in entities {
        out.push_str(&format!("{:<10} {}\n", e.id, e.name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvtax_core::SpvId;

    #[test]
    fn test_table_lists_each_entity() {
        let table = render_table(&[EntitySummary {
            id: SpvId::new("spv-001").unwrap(),
            name: "Tech Ventures Fund I".to_string(),
        }]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID"));
        assert_eq!(lines[1], "spv-001    Tech Ventures Fund I");
    }

    #[tokio::test]
    async fn test_lists_catalogue() {
        let clock = Arc::new(spvtax_engine::InstantClock::new());
        let code = run_entities(&EntitiesArgs { json: true }, clock).await.unwrap();
        assert_eq!(code, 0);
    }
}
