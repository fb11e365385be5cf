use crate::commands::common::{Common, Painter};
use clap::Parser;
use core::fmt::{self, Write};
use metric_catalog::{CatalogError, Color, MetricCatalog, MetricData, MetricValue, Region, RegionDb, Result, Timeseries};
use ohno::IntoAppError;
use std::sync::Arc;

const LOG_TARGET: &str = "      show";

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Region id, slug, or name
    #[arg(value_name = "REGION")]
    pub region: String,

    /// Metric ids [default: every configured metric]
    #[arg(value_name = "METRIC")]
    pub metrics: Vec<String>,

    /// Also print the last N points of each metric's history
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub history: usize,
}

pub async fn show(common: &Common, args: &ShowArgs) -> Result<()> {
    let catalog = common.catalog()?;
    let regions = common.regions()?;

    let region = regions.resolve(&args.region).into_app_err("resolving region")?;
    if region.region_id() != args.region && region.slug() != args.region {
        log::info!(target: LOG_TARGET, "Resolved '{}' to {region}", args.region);
    }

    let metrics = if args.metrics.is_empty() {
        catalog.metrics().cloned().collect()
    } else {
        args.metrics
            .iter()
            .map(|id| catalog.get_metric(id))
            .collect::<core::result::Result<Vec<_>, _>>()
            .into_app_err("resolving metrics")?
    };

    let results = catalog.fetch_many(metrics.iter().map(|m| (Arc::clone(&region), m))).await;

    let mut output = String::new();
    render(&mut output, common.painter, &catalog, &regions, &region, &results, args.history).into_app_err("formatting output")?;
    print!("{output}");
    Ok(())
}

fn render<W: Write>(
    writer: &mut W,
    painter: Painter,
    catalog: &MetricCatalog,
    regions: &RegionDb,
    region: &Region,
    results: &[core::result::Result<Arc<MetricData>, CatalogError>],
    history: usize,
) -> fmt::Result {
    write!(writer, "{}", painter.bold(&format!("{} ({})", region.full_name(), region.region_id())))?;
    for ancestor in regions.ancestors(region) {
        write!(writer, "{}", painter.dimmed(&format!(", {}", ancestor.short_name())))?;
    }
    writeln!(writer)?;

    let rows: Vec<_> = results.iter().map(|result| Row::new(catalog, result)).collect();
    let name_width = rows.iter().map(|row| row.name.chars().count()).max().unwrap_or(0);
    let value_width = rows.iter().map(|row| row.value.chars().count()).max().unwrap_or(0);

    for (row, result) in rows.iter().zip(results) {
        write!(writer, "  {:<name_width$}  ", row.name)?;
        match &row.outcome {
            Outcome::Failed(e) => writeln!(writer, "{}", painter.dimmed(&format!("error: {e}")))?,
            Outcome::Category(label, color) => {
                writeln!(writer, "{:<value_width$}  {}", row.value, painter.color(label, *color))?;
            }
            Outcome::NoData(color) => writeln!(writer, "{}", painter.color(&row.value, *color))?,
            Outcome::Unmapped => writeln!(writer, "{:<value_width$}  {}", row.value, painter.dimmed("unmapped"))?,
        }

        if history > 0
            && let Ok(data) = result
            && let Some(timeseries) = data.timeseries()
        {
            write_history(writer, painter, catalog, data, &timeseries.tail(history))?;
        }
    }

    Ok(())
}

fn write_history<W: Write>(
    writer: &mut W,
    painter: Painter,
    catalog: &MetricCatalog,
    data: &MetricData,
    points: &Timeseries<MetricValue>,
) -> fmt::Result {
    let metric = data.metric();
    for point in points {
        let date = painter.dimmed(&point.date.to_string());
        match &point.value {
            Some(value) => {
                let text = metric.format_value(value);
                let color = catalog.get_color(metric, value).unwrap_or_else(|_| catalog.placeholder_color());
                writeln!(writer, "      {date}  {}", painter.color(&text, color))?;
            }
            None => writeln!(writer, "      {date}  {}", painter.dimmed("-"))?,
        }
    }
    Ok(())
}

enum Outcome {
    Category(String, Color),
    NoData(Color),
    Unmapped,
    Failed(String),
}

struct Row {
    name: String,
    value: String,
    outcome: Outcome,
}

impl Row {
    fn new(catalog: &MetricCatalog, result: &core::result::Result<Arc<MetricData>, CatalogError>) -> Self {
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                let name = match e {
                    CatalogError::ProviderFailure { metric, .. } => metric.clone(),
                    _ => String::new(),
                };
                return Self {
                    name,
                    value: String::new(),
                    outcome: Outcome::Failed(e.to_string()),
                };
            }
        };

        let metric = data.metric();
        let name = metric.name().to_string();
        let Some(value) = data.current_value() else {
            return Self {
                name,
                value: "no data".to_string(),
                outcome: Outcome::NoData(catalog.placeholder_color()),
            };
        };

        let outcome = match catalog.get_category(metric, value) {
            Ok(category) => Outcome::Category(category.label, category.color),
            Err(_) => Outcome::Unmapped,
        };

        Self {
            name,
            value: metric.format_value(value),
            outcome,
        }
    }
}
