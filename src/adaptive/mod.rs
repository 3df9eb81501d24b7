/**
 * Adaptive Learning Engine (§4.5, §4.6, §4.7)
 *
 * Ties together the pattern store, behavior store, and the per-request learning
 * algorithm behind one public surface: `AdaptiveEngine`.
 */

pub mod behavior_store;
pub mod engine;
pub mod pattern;
pub mod pattern_store;

pub use engine::AdaptiveEngine;
pub use pattern::{EnhancedPattern, PatternSource};
