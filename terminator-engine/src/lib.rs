//! Termination pricing engine
//!
//! Drives one request from a target epoch to priced sectors:
//!
//! ```text
//! task list ─► BatchScheduler ─► worker ─► resolve epoch ─► (project signals)
//!                                              │
//!                                              ▼
//!                                 SectorFeeEvaluator ─► StrategyOptimizer
//!                                              │
//!                     ordered results ◄────────┘
//! ```
//!
//! Chain access and the protocol penalty formulas are injected through
//! [`ChainState`] and [`PenaltyModel`], so everything here runs against
//! the in-memory [`mock`] implementations in tests.

pub mod config;
pub mod traits;
pub mod projector;
pub mod resolver;
pub mod fee;
pub mod penalty;
pub mod strategy;
pub mod calculator;
pub mod scheduler;
pub mod summary;
pub mod expiration;
pub mod mock;

pub use config::{EngineConfig, ProjectionParams};
pub use traits::{ChainState, PenaltyModel};
pub use projector::project;
pub use resolver::{resolve, resolve_at, target_for, Resolution, ResolutionMode};
pub use fee::{ActiveSectorFee, PricingContext, SectorFee, SectorFeeEvaluator};
pub use penalty::ProtocolPenalties;
pub use strategy::{decide, StrategyOptimizer};
pub use calculator::TerminationCalculator;
pub use scheduler::{BatchScheduler, TaskOutcome};
pub use summary::{BatchSummary, FleetSummary};
pub use expiration::{days_until, scan_operator, DayBuckets, DayStats, ExpirationDistribution, OperatorExpiration};
