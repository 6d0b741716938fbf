//! Attribution command

use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color};
use trackflow_attribution::{
    AttributionOutcome, AttributionReport, AttributionService, ConversionEvent,
};

use super::{Context, new_table, percent};

#[derive(Args)]
pub struct AttributeArgs {
    /// Lead or deal identifier
    pub subject: String,

    /// Attribution model (defaults to the configured model)
    #[arg(long)]
    pub model: Option<String>,

    /// Conversion time in RFC 3339 (defaults to now)
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,

    /// Compute every model side by side
    #[arg(long, conflicts_with = "model")]
    pub all_models: bool,

    /// Print outcomes as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(ctx: &Context, args: AttributeArgs) -> Result<()> {
    let converted_at = parse_time(args.at.as_deref())?;
    let mut event = ConversionEvent::new(args.subject, converted_at);
    event.model = args.model;

    let store = Arc::new(ctx.open_store().await?);
    let service = AttributionService::new(store, ctx.config.attribution.clone());

    let outcomes = if args.all_models {
        service.attribute_all_models(&event).await?
    } else {
        vec![service.attribute(&event).await?]
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    for outcome in &outcomes {
        match outcome {
            AttributionOutcome::Attributed(report) => print_report(report),
            AttributionOutcome::Skipped {
                subject_id,
                model,
                reason,
            } => match model {
                Some(model) => println!("{subject_id} ({model}): skipped, {reason}"),
                None => println!("{subject_id}: skipped, {reason}"),
            },
        }
    }
    Ok(())
}

fn parse_time(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("Invalid conversion time: {s}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn print_report(report: &AttributionReport) {
    let attribution = &report.attribution;
    println!("{} - {}", report.subject_id, attribution.model);

    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Touchpoint").fg(Color::Cyan),
        Cell::new("Channel").fg(Color::Cyan),
        Cell::new("Campaign").fg(Color::Cyan),
        Cell::new("Credit").fg(Color::Cyan),
    ]);
    for credit in &attribution.credits {
        table.add_row(vec![
            Cell::new(credit.touchpoint_id.as_str()),
            Cell::new(&credit.channel),
            Cell::new(credit.campaign_id.as_deref().unwrap_or("-")),
            Cell::new(percent(credit.credit)),
        ]);
    }
    println!("{table}");

    if report.excluded > 0 {
        println!(
            "{} touchpoint(s) outside the attribution window were ignored",
            report.excluded
        );
    }
    println!();
}
