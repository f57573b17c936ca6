mod def_site;
mod rd_map;

pub use def_site::{DefSite, ReachingSet};
pub use rd_map::RdMap;
