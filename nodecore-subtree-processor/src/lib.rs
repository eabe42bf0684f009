mod ancestor;
mod blob;
mod processor;
mod state;

pub use ancestor::find_common_ancestor_split;
pub use blob::SubtreeBlobStore;
pub use processor::SubtreeProcessor;
