pub mod snapshot;

pub use snapshot::generate_snapshot;
