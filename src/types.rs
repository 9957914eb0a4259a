/// Opaque, stable author identifier taken from the first corpus column.
/// Example: `3287128`
pub type AuthorId = String;
/// Case-folded gender label.
/// Examples: `male`, `female`
pub type Gender = String;
/// Zodiac sign label, stored verbatim.
/// Examples: `Leo`, `Sagittarius`
pub type Zodiac = String;
/// Single token produced by the transform chain.
/// Examples: `hello`, `NUM`, `NONASCII`
pub type Token = String;
/// Ordered token sequence; duplicates are kept and order is significant.
pub type TokenSequence = Vec<Token>;
/// One line appended to a line log.
/// Examples: `1532` (types seen so far), `0.0132` (elapsed seconds)
pub type LogLine = String;
/// Bucket key used by the length counter.
/// Examples: `<50`, `200+`
pub type BucketKey = String;
