//! Regions and the region database
//!
//! A [`Region`] is an immutable entity identified by a unique id and a unique, URL-friendly slug,
//! optionally nested under a parent region. A [`RegionDb`] indexes an ordered list of regions by id
//! and slug and shares them as `Arc<Region>`; it is built once, from code or from a dataset file of
//! [`RegionRecord`]s, and never mutated afterwards.

mod region;
mod region_db;
mod region_record;

pub use region::Region;
pub use region_db::{RegionDb, RegionMatch};
pub use region_record::{RegionRecord, slugify};
