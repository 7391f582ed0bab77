pub mod assemble;
pub mod batch;
pub mod constants;
pub mod merge;
mod options;
pub mod pipeline;
pub mod plan;
pub mod repack;
pub mod scan;
pub mod split;
mod stats;
mod types;

pub use assemble::{AssembledDocument, assemble_document};
pub use batch::{BatchManifest, BatchUpdate, process_batch};
pub use merge::{MergeOutcome, merge_strip};
pub use options::*;
pub use pipeline::{process_work, run_work, segment_strip};
pub use plan::{cut_segments, plan_cuts};
pub use repack::{ChunkEncoder, RasterEncoder, RepackOutcome, repack};
pub use scan::{bands_from_classes, classify_rows, scan_bands};
pub use split::enforce_height_ceiling;
pub use stats::calculate_statistics;
pub use types::*;
