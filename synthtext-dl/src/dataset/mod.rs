//! Annotation sources and the grounded example builder.

mod grounded;
mod record;
mod synthtext;

pub use grounded::*;
pub use record::*;
pub use synthtext::*;

use crate::common::*;

/// Read-only, position-indexable source of per-image word annotations.
pub trait AnnotationSource: Debug + Send {
    /// The list of per-image records.
    fn records(&self) -> &[Arc<WordRecord>];

    /// The number of annotated images.
    fn num_records(&self) -> usize {
        self.records().len()
    }
}
