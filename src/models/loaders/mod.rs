pub mod candidate_loader;

pub use candidate_loader::{parse_candidates, CandidateSource};
