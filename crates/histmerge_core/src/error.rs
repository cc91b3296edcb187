use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no {{{{article history}}}} transclusion found")]
    TemplateNotFound,

    #[error("parameter segment without '=': {segment:?}")]
    MalformedSegment { segment: String },
}

/// Failures while folding banner entries into the article history template.
/// One page's error never aborts a batch; callers log and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unparseable {kind} date: {value:?}")]
    UnparseableDate { kind: &'static str, value: String },

    #[error("{{{{dyk talk}}}} banner is missing its entry= parameter")]
    MissingDykEntry,

    #[error("{{{{dyk talk}}}} banner has no usable date parameters")]
    MissingDykDate,

    #[error("more than one {{{{dyk talk}}}} banner on the page")]
    MultipleDykBanners,

    #[error("no dated {kind} entries to merge")]
    EmptyBanner { kind: &'static str },
}
