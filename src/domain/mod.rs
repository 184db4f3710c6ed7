//! Exchange-agnostic domain logic.
//!
//! Value types shared by the hub, detector, risk and execution layers, plus
//! the pure proportional sizer. Nothing in here performs I/O.

pub mod detection;
pub mod error;
pub mod event;
pub mod execution;
pub mod history;
pub mod id;
pub mod position;
pub mod price;
pub mod risk;
pub mod sizing;

pub use detection::{DetectionEvent, DetectionMetadata, Direction, Strategy, Trigger};
pub use event::{
    EventKind, Fill, InstrumentMetadata, InstrumentResolved, NewInstrument, PriceUpdate,
    TradePrint,
};
pub use execution::{
    ExecutionResult, FulfillmentMode, OrderAck, OrderRequest, OrderSide, OrderSize,
};
pub use history::{HistoryLimits, PriceSample, PushOutcome, RollingHistory};
pub use id::{AccountId, ConditionId, InstrumentId, OrderId};
pub use position::{CloseReason, ExitBounds, TrackedPosition};
pub use risk::{ReasonCode, RiskAssessment};
pub use sizing::{SizingInputs, SizingReason, SizingResult};
