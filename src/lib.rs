pub mod broker;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod orchestration;
pub mod stream;

pub use broker::{CredentialProvider, FileTokenProvider, OrderGateway, StaticTokenProvider};
pub use config::Config;
pub use db::{init_db, ApplyOutcome, Repository};
pub use domain::{
    AccountId, BrokerEvent, Decimal, ExecId, Execution, ExecutionEvent, Market, Order, OrderNo,
    OrderStatus, OrderStatusEvent, Position, Side, Ticker, Trade,
};
pub use engine::PositionPolicy;
pub use error::LedgerError;
pub use normalizer::{FieldMap, Normalizer};
pub use orchestration::EventProcessor;
pub use stream::{StreamConfig, StreamSupervisor, Subscription};
