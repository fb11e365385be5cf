mod common;
mod convert;
mod init;
mod metrics;
mod regions;
mod show;
mod validate;

pub use common::{Common, CommonArgs, init_logging};
pub use convert::{ConvertArgs, convert_config};
pub use init::{InitArgs, init_config};
pub use metrics::list_metrics;
pub use regions::{RegionsArgs, list_regions};
pub use show::{ShowArgs, show};
pub use validate::validate_config;
