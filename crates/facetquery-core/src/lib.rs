pub mod assemble;
pub mod config;
pub mod errors;
pub mod model;
pub mod query;
pub mod translate;
pub mod util;

pub use assemble::*;
pub use config::AssemblerConfig;
pub use errors::*;
pub use model::*;
pub use query::*;
pub use translate::{translate, FilterClause, FilterTranslator, PathFilter, SkipReason, Translation};
