//! Signature Review Common Library
//!
//! CLIとレビューセッションで共有される型とレスポンスパーサー

pub mod types;
pub mod error;
pub mod parser;
pub mod wire;

pub use types::{
    Ack, CandidateMatch, MatchMethod, MatchResultSet, ReviewStatus, SignatureRecord,
};
pub use error::{Error, Result};
pub use parser::{parse_details_response, parse_extraction_response, parse_finalize_response};
