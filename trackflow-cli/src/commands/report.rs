//! Credit report command

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use trackflow_attribution::{GroupBy, ModelKind, TouchpointStore, aggregate_credit};

use super::{Context, new_table, percent};

#[derive(Args)]
pub struct ReportArgs {
    /// Model to report on (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Group credit by `channel` or `campaign`
    #[arg(long, default_value = "channel")]
    pub by: String,
}

pub async fn run(ctx: &Context, args: ReportArgs) -> Result<()> {
    let model: ModelKind = args
        .model
        .as_deref()
        .unwrap_or(&ctx.config.attribution.default_model)
        .parse()?;
    let group_by: GroupBy = args.by.parse()?;

    let store = ctx.open_store().await?;
    let allocations = store.all_allocations(Some(model)).await?;
    if allocations.is_empty() {
        println!("No {model} attributions recorded yet.");
        return Ok(());
    }

    let totals = aggregate_credit(&allocations, group_by);
    let grand_total: f64 = totals.iter().map(|t| t.credit).sum();

    let mut table = new_table();
    table.set_header(vec![
        Cell::new(group_by.to_string()).fg(Color::Cyan),
        Cell::new("Attributed conversions").fg(Color::Cyan),
        Cell::new("Share").fg(Color::Cyan),
        Cell::new("Touchpoints").fg(Color::Cyan),
        Cell::new("Deals").fg(Color::Cyan),
    ]);
    for total in &totals {
        table.add_row(vec![
            Cell::new(&total.key),
            Cell::new(format!("{:.2}", total.credit)),
            Cell::new(percent(total.credit / grand_total)),
            Cell::new(total.touchpoints),
            Cell::new(total.conversions),
        ]);
    }

    println!("{model} attribution by {group_by}");
    println!("{table}");
    Ok(())
}
