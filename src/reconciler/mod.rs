mod engine;

pub use engine::{Reconciler, ReinitStats, ScanStats};
