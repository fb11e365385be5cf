use crate::commands::common::{Common, Painter};
use core::fmt::{self, Write};
use metric_catalog::{Metric, MetricCategory, MetricKind, MetricValue, Result, ThresholdOrder};
use ohno::IntoAppError;
use std::sync::Arc;

pub fn list_metrics(common: &Common) -> Result<()> {
    let catalog = common.catalog()?;
    let metrics: Vec<_> = catalog.metrics().cloned().collect();

    let mut output = String::new();
    render(&mut output, common.painter, &metrics).into_app_err("formatting output")?;
    print!("{output}");
    Ok(())
}

fn render<W: Write>(writer: &mut W, painter: Painter, metrics: &[Arc<Metric>]) -> fmt::Result {
    for (index, metric) in metrics.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }

        writeln!(
            writer,
            "{}  {}",
            painter.bold(metric.id()),
            painter.dimmed(&format!("{} metric from '{}'", metric.kind(), metric.provider()))
        )?;
        writeln!(writer, "  {}", metric.extended_name())?;

        if metric.categories().is_empty() {
            writeln!(writer, "    {}", painter.dimmed("no categories"))?;
            continue;
        }

        let label_width = metric.categories().iter().map(|c| c.label.chars().count()).max().unwrap_or(0);
        for category in metric.categories() {
            let label = format!("{:<label_width$}", category.label);
            writeln!(writer, "    {}  {}", painter.color(&label, category.color), describe(metric, category))?;
        }
    }

    Ok(())
}

/// The condition under which a value falls into `category`.
fn describe(metric: &Metric, category: &MetricCategory) -> String {
    match (&category.value, metric.kind()) {
        (None, _) => "otherwise".to_string(),
        (Some(value @ MetricValue::Number(_)), MetricKind::Numeric) => {
            let op = match metric.threshold_order() {
                ThresholdOrder::Ascending => "<=",
                ThresholdOrder::Descending => ">=",
            };
            format!("{op} {}", metric.format_value(value))
        }
        (Some(value), _) => format!("= {value}"),
    }
}
