//! Attribution model listing

use anyhow::Result;
use comfy_table::{Cell, Color};
use trackflow_attribution::{ModelKind, model_for_kind};

use super::{Context, new_table};

pub fn run(ctx: &Context) -> Result<()> {
    let settings = &ctx.config.attribution;
    let default: Option<ModelKind> = settings.default_model.parse().ok();

    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for kind in ModelKind::ALL {
        // Surface parameter problems per model instead of failing the listing
        let status = match model_for_kind(kind, settings) {
            Ok(_) if Some(kind) == default => Cell::new("default").fg(Color::Green),
            Ok(_) => Cell::new(""),
            Err(e) => Cell::new(e.to_string()).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(kind.display_name()),
            Cell::new(kind.as_str()),
            Cell::new(kind.description()),
            status,
        ]);
    }

    println!("{table}");
    if default.is_none() {
        println!(
            "Configured default model {:?} is not a known model",
            settings.default_model
        );
    }
    Ok(())
}
