/**
 * HybridPipeline composition root (§4.8, §4.9)
 */

pub mod cache;
pub mod hybrid;

pub use hybrid::{HybridPipeline, HybridPipelineConfig};
