//! Text extraction stages.
//!
//! Report text → Date Extraction → Candidate Scanning → (resolver) → Range Enrichment

mod date;
mod filters;
mod range;
mod scanner;

pub use date::{parse_date_string, DateExtractor, ExtractedDate};
pub use filters::{is_date_like, is_section_header, CandidateFilter};
pub use range::RangeEnricher;
pub use scanner::{clean_name, CandidateScanner};
