pub mod bar;
pub mod config;
pub mod indicators;
pub mod pivot;
pub mod signal;

pub use bar::BarSeries;
pub use config::{ConfigError, StrategyParams};
pub use pivot::{find_pivots, Pivot, PivotKind};
pub use signal::{Direction, Outcome, Signal};
