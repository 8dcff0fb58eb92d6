pub mod filing_source;
pub mod sec_edgar_source;

pub use filing_source::FilingSource;
pub use sec_edgar_source::SecEdgarFilingSource;
