//! Virtual memory subsystem (spec.md §4, modules C1–C5).

pub mod engine;
pub mod eviction;
pub mod frame_table;
pub mod page_table;
pub mod swap;

pub use engine::VmEngine;
pub use eviction::{EvictionPolicy, EvictionPolicyKind};
pub use frame_table::{FrameId, FrameTable};
pub use page_table::{PageTable, PageTableEntry};
pub use swap::SwapStore;
