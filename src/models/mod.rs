mod liquidity_bin;
mod pool_snapshot;
mod whale_event;

pub use liquidity_bin::LiquidityBin;
pub use pool_snapshot::PoolSnapshot;
pub use whale_event::{
    BinRange, ChangeType, DetectionMethod, RiskLevel, TopChange, WhaleActivityEvent,
};
