mod jsonl;
mod resolve;
mod snapshot;

pub use resolve::resolve;
pub use snapshot::{SNAPSHOT_FORMAT_VERSION, WorldMeta, load_snapshot, save_snapshot};
