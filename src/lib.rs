pub mod classifier;
pub mod enrichment;
pub mod filter_engine;
pub mod llm_adapter;
pub mod pipeline;
pub mod ranking;
pub mod store;
pub mod traits;
pub mod types;

pub use classifier::parse_classification_response;
pub use enrichment::ClassificationStage;
pub use filter_engine::{check_breakout, post_cluster_filter, pre_filter_soft_gate, RuleMatcher};
pub use llm_adapter::{HttpLlmAdapter, LlmAdapter, LlmConfig, MockLlmAdapter};
pub use pipeline::CurationPipeline;
pub use ranking::{compute_ranking, rank_clusters, RankedCluster};
pub use store::PgCurationStore;
pub use types::*;
