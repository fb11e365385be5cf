use crate::commands::common::{Common, Painter};
use clap::Parser;
use core::fmt::{self, Write};
use metric_catalog::{RegionDb, RegionMatch, Result};
use ohno::IntoAppError;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct RegionsArgs {
    /// Search for regions by id, abbreviation, slug or name instead of listing all of them
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Maximum number of regions to print
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub limit: usize,
}

pub fn list_regions(common: &Common, args: &RegionsArgs) -> Result<()> {
    let regions = common.regions()?;

    let matches: Vec<_> = match &args.query {
        Some(query) => regions.search(query, args.limit),
        None => regions
            .iter()
            .take(args.limit)
            .map(|region| RegionMatch {
                region: Arc::clone(region),
                score: 1.0,
            })
            .collect(),
    };

    let mut output = String::new();
    render(&mut output, common.painter, &regions, &matches, args.query.is_some()).into_app_err("formatting output")?;
    print!("{output}");

    if args.query.is_none() && regions.len() > matches.len() {
        eprintln!("({} of {} regions shown, use --limit to see more)", matches.len(), regions.len());
    }

    Ok(())
}

fn render<W: Write>(writer: &mut W, painter: Painter, regions: &RegionDb, matches: &[RegionMatch], show_score: bool) -> fmt::Result {
    if matches.is_empty() {
        return writeln!(writer, "{}", painter.dimmed("no matching regions"));
    }

    let id_width = matches.iter().map(|m| m.region.region_id().chars().count()).max().unwrap_or(0);
    for m in matches {
        let region = &m.region;
        write!(writer, "{}  {}", painter.bold(&format!("{:<id_width$}", region.region_id())), region.full_name())?;

        if let Some(parent) = regions.parent_of(region) {
            write!(writer, ", {}", parent.short_name())?;
        }

        let mut details = vec![region.slug().to_string()];
        if let Some(population) = region.population() {
            details.push(format!("pop. {population}"));
        }
        if show_score {
            details.push(format!("score {:.2}", m.score));
        }
        writeln!(writer, "  {}", painter.dimmed(&format!("[{}]", details.join(", "))))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metric_catalog::Region;

    #[test]
    fn test_render_search() {
        let db = RegionDb::new(vec![
            Region::new("53", "Washington").with_abbreviation("WA").with_population(7_705_281),
            Region::new("53033", "King County").with_parent("53").with_slug("king-county-wa"),
        ]);

        let matches = db.search("wa", 5);
        let mut output = String::new();
        render(&mut output, Painter::plain(), &db, &matches, true).unwrap();
        assert_eq!(output, "53  Washington  [washington, pop. 7705281, score 1.00]\n");
    }

    #[test]
    fn test_render_listing_with_parent() {
        let db = RegionDb::new(vec![Region::new("53", "Washington"), Region::new("53033", "King County").with_parent("53")]);
        let matches: Vec<_> = db
            .iter()
            .map(|region| RegionMatch {
                region: Arc::clone(region),
                score: 1.0,
            })
            .collect();

        let mut output = String::new();
        render(&mut output, Painter::plain(), &db, &matches, false).unwrap();
        assert_eq!(output, "53     Washington  [washington]\n53033  King County, Washington  [king-county]\n");
    }

    #[test]
    fn test_render_nothing() {
        let mut output = String::new();
        render(&mut output, Painter::plain(), &RegionDb::new(Vec::new()), &[], true).unwrap();
        assert_eq!(output, "no matching regions\n");
    }
}
