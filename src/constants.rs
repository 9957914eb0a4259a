/// Constants used by label parsing and file naming.
pub mod labels {
    /// Separator between label fields in per-author file names.
    pub const FILE_NAME_SEPARATOR: char = '.';
    /// Number of `.`-separated parts in `<id>.<gender>.<age>.<zodiac>.csv`.
    pub const FILE_NAME_PARTS: usize = 5;
    /// Upper bound (inclusive) of the youngest age bracket.
    pub const UNDER_TWENTY_MAX_AGE: u64 = 19;
    /// Upper bound (inclusive) of the middle age bracket.
    pub const TWENTIES_MAX_AGE: u64 = 29;
}

/// Constants used by corpus discovery and decoding.
pub mod source {
    /// Extension of recognized corpus files.
    pub const CORPUS_EXTENSION: &str = "csv";
    /// Default number of decoded file batches buffered between producer and consumer.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
    /// Number of leading bytes inspected when sniffing binary content.
    pub const BINARY_SNIFF_BYTES: usize = 8192;
    /// Minimum number of label columns a corpus row must carry.
    pub const LABEL_COLUMNS: usize = 4;
    /// Column index of the free-text body.
    pub const TEXT_COLUMN: usize = 4;
    /// Thread name used for corpus producer threads.
    pub const PRODUCER_THREAD_NAME: &str = "corpus-producer";
    /// Log message used when unreadable rows are skipped.
    pub const SKIP_ROW_MSG: &str = "skipping unreadable corpus row";
    /// Log message used when unreadable files are skipped.
    pub const SKIP_FILE_MSG: &str = "skipping unreadable corpus file";
}

/// Constants used by the transform chain.
pub mod transform {
    /// Sentinel replacing numeral tokens.
    pub const NUM_TOKEN: &str = "NUM";
    /// Sentinel replacing tokens containing non-ASCII characters.
    pub const NONASCII_TOKEN: &str = "NONASCII";
    /// Maximum run of identical characters kept by elongation reduction.
    pub const ELONGATION_LIMIT: usize = 3;
}

/// Constants used by background writers and persistence.
pub mod writer {
    /// Default capacity of the transformed-corpus writer queue.
    pub const DEFAULT_WRITER_QUEUE_CAPACITY: usize = 5;
    /// Default capacity of the label-log writer queue.
    pub const DEFAULT_LABEL_QUEUE_CAPACITY: usize = 4096;
    /// Thread name used for transformed-corpus writers.
    pub const CORPUS_WRITER_NAME: &str = "corpus-writer";
    /// Thread name used for label-log writers.
    pub const LABEL_WRITER_NAME: &str = "label-writer";
    /// Thread name used for line-log writers.
    pub const LINE_WRITER_NAME: &str = "line-writer";
}

/// Constants used by the durable label log.
pub mod label_log {
    /// Version tag for persisted label records.
    pub const LABEL_RECORD_VERSION: u8 = 1;
    /// Prefix marker for bitcode-encoded payloads.
    pub const BITCODE_PREFIX: u8 = b'B';
    /// Default label-log filename inside a temporary directory.
    pub const DEFAULT_LABEL_LOG_FILENAME: &str = "labels.log";
    /// Size in bytes of the record length prefix.
    pub const LENGTH_PREFIX_BYTES: usize = 4;
}

/// Constants used by corpus counters and their outputs.
pub mod counters {
    /// Default vocabulary output filename.
    pub const DEFAULT_VOCABULARY_FILENAME: &str = "vocabulary.json";
    /// Default types-per-file log filename.
    pub const DEFAULT_TYPES_LOG_FILENAME: &str = "count_type.csv";
    /// Default timing log filename.
    pub const DEFAULT_TIME_LOG_FILENAME: &str = "time_count_type.csv";
    /// Length histogram output filename.
    pub const LENGTHS_FILENAME: &str = "lengths.json";
    /// Label histogram output filename.
    pub const LABELS_FILENAME: &str = "labels.json";
    /// Length bucket for posts of at most 50 tokens.
    pub const BUCKET_SHORT: &str = "<50";
    /// Length bucket for posts of 51 to 99 tokens.
    pub const BUCKET_MEDIUM: &str = "50-99";
    /// Length bucket for posts of 100 to 199 tokens.
    pub const BUCKET_LONG: &str = "100-199";
    /// Length bucket for posts of 200 tokens or more.
    pub const BUCKET_VERY_LONG: &str = "200+";
}
