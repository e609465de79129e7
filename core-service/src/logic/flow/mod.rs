//! Flow Module - Connection-level aggregation
//!
//! PacketRecord → FlowState (sharded table) → FinalizedFlow → NetworkFlow.
//!
//! ## Lifecycle
//! - Tạo khi packet đầu tiên của key đến
//! - Finalize khi tổng packets >= batch threshold, hoặc idle > timeout
//! - Packets sau đó trên cùng key bắt đầu một flow mới

pub mod key;
pub mod state;
pub mod aggregator;
pub mod sweeper;


// Re-export common types
pub use aggregator::{AggregatorStats, FlowAggregator};
pub use key::FlowKey;
pub use state::{CloseReason, FinalizedFlow, FlowState};
pub use sweeper::{spawn_sweeper, SweeperHandle};
