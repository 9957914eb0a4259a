mod common;

use std::fs;

use blogprof::{
    DumpState, LabelLog, PipelineError, Preprocessor, TokenMapper, TransformChain,
    labels::labels_from_file_name,
};
use tempfile::tempdir;

use common::{write_author, write_sample_corpus};

fn preprocessor() -> Preprocessor {
    Preprocessor::new(TransformChain::default().with_mapper(TokenMapper::MaskNumerals))
}

#[test]
fn persisted_corpus_round_trips_tokens_and_labels() {
    let temp = tempdir().unwrap();
    let corpus = temp.path().join("corpus");
    let output = temp.path().join("output");
    fs::create_dir(&corpus).unwrap();
    write_sample_corpus(&corpus);

    let preprocessor = preprocessor();
    let report = preprocessor.persist_transformed(&corpus, &output).unwrap();
    assert_eq!(report.files_written, 3);
    assert_eq!(report.rows_written, 7);
    assert_eq!(report.stream.rows_skipped, 1);

    let mut names: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["1.male.15.Aries.csv", "2.female.23.Leo.csv", "3.female.48.Virgo.csv"]
    );
    for name in &names {
        assert!(labels_from_file_name(name).is_ok());
    }

    let original = preprocessor.collect(&corpus).unwrap();
    let reread = Preprocessor::new(TransformChain::default())
        .collect(&output)
        .unwrap();
    assert_eq!(reread, original);
}

#[test]
fn destination_is_wiped_before_writing() {
    let temp = tempdir().unwrap();
    let corpus = temp.path().join("corpus");
    let output = temp.path().join("output");
    fs::create_dir(&corpus).unwrap();
    fs::create_dir(&output).unwrap();
    fs::write(output.join("stale.csv"), "old").unwrap();
    write_author(&corpus, "9.male.19.Leo.csv", &["9,male,19,Leo,twice", "9,male,19,Leo,run"]);

    let preprocessor = preprocessor();
    preprocessor.persist_transformed(&corpus, &output).unwrap();
    preprocessor.persist_transformed(&corpus, &output).unwrap();

    assert!(!output.join("stale.csv").exists());
    let body = fs::read_to_string(output.join("9.male.19.Leo.csv")).unwrap();
    assert_eq!(body.lines().count(), 2);
}

#[test]
fn labels_that_name_a_path_are_skipped_not_written() {
    let temp = tempdir().unwrap();
    let corpus = temp.path().join("corpus");
    let output = temp.path().join("output");
    fs::create_dir(&corpus).unwrap();
    write_author(&corpus, "4.male.20.Leo.csv", &["../escaped,male,20,Leo,hello"]);
    write_author(
        &corpus,
        "5.male.20.Leo.csv",
        &["5,../../up,20,Leo,sneaky", "5,male,20,Leo,kept"],
    );

    let report = preprocessor().persist_transformed(&corpus, &output).unwrap();
    assert_eq!(report.stream.rows_skipped, 2);
    assert_eq!(report.files_written, 1);
    assert_eq!(report.rows_written, 1);

    assert!(!temp.path().join("escaped.male.20.Leo.csv").exists());
    let names: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["5.male.20.Leo.csv"]);
    let mut top: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    top.sort();
    assert_eq!(top, vec!["corpus", "output"]);
}

#[test]
fn persisting_into_the_source_is_refused() {
    let temp = tempdir().unwrap();
    write_sample_corpus(temp.path());
    let result = preprocessor().persist_transformed(temp.path(), temp.path());
    assert!(matches!(
        result,
        Err(PipelineError::DestinationConflict { .. })
    ));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 3);
}

#[test]
fn label_replay_follows_a_complete_dump() {
    let temp = tempdir().unwrap();
    let corpus = temp.path().join("corpus");
    fs::create_dir(&corpus).unwrap();
    write_sample_corpus(&corpus);

    let mut preprocessor =
        preprocessor().with_label_log(LabelLog::at(temp.path().join("labels").join("dump.log")));
    assert!(matches!(
        preprocessor.replay_labels(),
        Err(PipelineError::Precondition(_))
    ));

    let streamed: Vec<_> = preprocessor
        .persist_labels_async(&corpus)
        .unwrap()
        .map(|point| point.labels)
        .collect();
    assert_eq!(streamed.len(), 7);
    assert_eq!(preprocessor.label_state(), DumpState::Complete { records: 7 });

    let replayed: Vec<_> = preprocessor
        .replay_labels()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(replayed, streamed);
    assert!(temp.path().join("labels").join("dump.log").is_file());
}
