pub mod cell;
pub mod options;
pub mod report;

pub use cell::Cell;
pub use options::ProfileOptions;
pub use report::{
    CategoricalStats, ColumnStats, ColumnType, CorrelationPair, CorrelationPartitions, Insight,
    InsightType, NumericStats, ProcessingTime, ProfileReport, SamplingMetadata, Severity, Summary,
    sort_insights,
};
