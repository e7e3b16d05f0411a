//! Per-query merge of delegate outputs, addressable by display label

pub mod aggregator;

pub use aggregator::{
    humanize, DelegationAggregator, DelegationRecord, Observation, Progress,
    NO_QUERY_PLACEHOLDER, NO_RESPONSE_PLACEHOLDER, PROGRESS_BASELINE,
};
