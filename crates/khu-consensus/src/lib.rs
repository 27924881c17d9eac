pub mod finality;
pub mod producer;

pub use finality::{quorum_seed, select_quorum, FinalitySignature, FinalityStore};
pub use producer::{
    bootstrap_block_time, calculate_block_producer_scores, fallback_rank, producer_score,
    select_producer, verify_block_producer_signature,
};
