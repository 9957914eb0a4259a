use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, error::ErrorKind};

use crate::config::PipelineConfig;
use crate::constants::counters::{
    DEFAULT_TIME_LOG_FILENAME, DEFAULT_TYPES_LOG_FILENAME, DEFAULT_VOCABULARY_FILENAME,
    LABELS_FILENAME, LENGTHS_FILENAME,
};
use crate::constants::source::DEFAULT_QUEUE_CAPACITY;
use crate::constants::writer::DEFAULT_WRITER_QUEUE_CAPACITY;
use crate::counters::{count_labels, count_lengths, count_types, write_json};
use crate::observe::{PipelineObserver, TimingLog};
use crate::pipeline::Preprocessor;
use crate::transform::{SocialTokenizer, TokenMapper, Tokenizer, TransformChain};
use crate::writer::LineLog;

#[derive(Debug, Parser)]
#[command(
    name = "blogprof",
    disable_help_subcommand = true,
    about = "Blog author-profiling corpus preprocessing",
    long_about = "Stream a directory of per-author CSV files through a configurable transform chain, count corpus statistics, or write the transformed corpus to disk."
)]
struct BlogprofCli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Count tokens and types, logging the running type count per file.
    CountTypes {
        #[arg(value_name = "CORPUS_DIR")]
        corpus: PathBuf,
        #[arg(long, help = "Log seconds elapsed each time a file is opened")]
        time: bool,
        #[arg(long, value_name = "FILE", help = "Types-per-file log path")]
        count: Option<PathBuf>,
        #[arg(long, value_name = "FILE", help = "Vocabulary JSON output path")]
        json: Option<PathBuf>,
        #[arg(long, value_name = "DIR", default_value = ".", help = "Directory for default outputs")]
        out: PathBuf,
        #[command(flatten)]
        chain: ChainArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Histogram of post lengths in tokens.
    CountLengths {
        #[arg(value_name = "CORPUS_DIR")]
        corpus: PathBuf,
        #[arg(value_name = "RESULTS_DIR")]
        results: PathBuf,
        #[command(flatten)]
        chain: ChainArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Label multiplicities derived from file names.
    CountLabels {
        #[arg(value_name = "CORPUS_DIR")]
        corpus: PathBuf,
        #[arg(value_name = "RESULTS_DIR")]
        results: PathBuf,
    },
    /// Write the transformed corpus to a destination directory.
    Transform {
        #[arg(value_name = "CORPUS_DIR")]
        corpus: PathBuf,
        #[arg(value_name = "DESTINATION_DIR")]
        destination: PathBuf,
        #[command(flatten)]
        chain: ChainArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
struct ChainArgs {
    #[arg(long, help = "Use the social-media tokenizer instead of whitespace splitting")]
    social: bool,
    #[arg(long, help = "Split punctuation off word tokens")]
    split_punctuation: bool,
    #[arg(long, help = "Lower-case every token")]
    lowercase: bool,
    #[arg(long, help = "Replace numerals with NUM")]
    mask_numerals: bool,
    #[arg(long, help = "Replace tokens with non-ASCII characters with NONASCII")]
    mask_non_ascii: bool,
}

impl ChainArgs {
    fn build(&self) -> TransformChain {
        let tokenizer = if self.social {
            Tokenizer::Social(SocialTokenizer::default())
        } else {
            Tokenizer::Whitespace
        };
        [
            (self.split_punctuation, TokenMapper::SplitPunctuation),
            (self.lowercase, TokenMapper::Lowercase),
            (self.mask_numerals, TokenMapper::MaskNumerals),
            (self.mask_non_ascii, TokenMapper::MaskNonAscii),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(TransformChain::new(tokenizer), |chain, (_, mapper)| {
            chain.with_mapper(mapper)
        })
    }
}

#[derive(Debug, Clone, Args)]
struct PipelineArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_QUEUE_CAPACITY,
        help = "Decoded files buffered between reader and consumer"
    )]
    queue_capacity: usize,
    #[arg(
        long,
        default_value_t = DEFAULT_WRITER_QUEUE_CAPACITY,
        help = "Author files buffered ahead of the writer thread"
    )]
    writer_queue_capacity: usize,
    #[arg(long, value_name = "N", help = "Stop after the first N corpus files")]
    max_files: Option<usize>,
    #[arg(long, help = "Read files even when their content looks binary")]
    include_binary: bool,
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_queue_capacity(self.queue_capacity)
            .with_writer_queue_capacity(self.writer_queue_capacity)
            .with_max_files(self.max_files)
            .with_skip_binary(!self.include_binary)
    }
}

/// Parse `args_iter` (without the program name) and run one subcommand.
pub fn run_blogprof<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<BlogprofCli, _>(std::iter::once("blogprof".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    match cli.command {
        Command::CountTypes {
            corpus,
            time,
            count,
            json,
            out,
            chain,
            pipeline,
        } => {
            let count = count.unwrap_or_else(|| out.join(DEFAULT_TYPES_LOG_FILENAME));
            let json = json.unwrap_or_else(|| out.join(DEFAULT_VOCABULARY_FILENAME));
            let timing = time.then(|| out.join(DEFAULT_TIME_LOG_FILENAME));
            run_count_types(
                &corpus,
                &count,
                &json,
                timing.as_deref(),
                chain.build(),
                pipeline.config(),
            )
        }
        Command::CountLengths {
            corpus,
            results,
            chain,
            pipeline,
        } => {
            let preprocessor = Preprocessor::new(chain.build()).with_config(pipeline.config());
            let mut stream = preprocessor.stream(&corpus)?;
            let report = count_lengths(stream.by_ref());
            if let Some(err) = stream.take_error() {
                return Err(err.into());
            }
            write_json(&results.join(LENGTHS_FILENAME), &report)?;
            for (bucket, posts) in &report.buckets {
                println!("{bucket}\t{posts}");
            }
            Ok(())
        }
        Command::CountLabels { corpus, results } => {
            let counts = count_labels(&corpus)?;
            write_json(&results.join(LABELS_FILENAME), &counts)?;
            println!(
                "genders: {}  age brackets: {}  zodiacs: {}",
                counts.genders.len(),
                counts.ages.len(),
                counts.zodiacs.len()
            );
            Ok(())
        }
        Command::Transform {
            corpus,
            destination,
            chain,
            pipeline,
        } => {
            let preprocessor = Preprocessor::new(chain.build()).with_config(pipeline.config());
            let report = preprocessor.persist_transformed(&corpus, &destination)?;
            println!(
                "wrote {} author files ({} rows, {} skipped) to {}",
                report.files_written,
                report.rows_written,
                report.stream.rows_skipped,
                report.destination.display()
            );
            Ok(())
        }
    }
}

fn run_count_types(
    corpus: &Path,
    count_path: &Path,
    json_path: &Path,
    timing_path: Option<&Path>,
    chain: TransformChain,
    config: PipelineConfig,
) -> Result<(), Box<dyn Error>> {
    let timing = timing_path.map(TimingLog::open).transpose()?.map(Arc::new);
    let mut preprocessor = Preprocessor::new(chain).with_config(config);
    if let Some(timing) = &timing {
        preprocessor = preprocessor.with_observer(Arc::clone(timing) as Arc<dyn PipelineObserver>);
    }

    let types_log = LineLog::open(count_path)?;
    let mut files = preprocessor.stream_files(corpus)?;
    let report = count_types(files.by_ref(), Some(&types_log))?;
    let failure = files.take_error();
    drop(files);
    types_log.close()?;
    if let Some(timing) = &timing {
        timing.close()?;
    }
    if let Some(err) = failure {
        return Err(err.into());
    }

    write_json(json_path, &report.vocabulary)?;
    println!("tokens: {}", report.tokens);
    println!("types: {}", report.types);
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
