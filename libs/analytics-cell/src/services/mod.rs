pub mod aggregator;

pub use aggregator::AnalyticsService;
