#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// Write one per-author corpus file with `rows` as CSV lines.
pub fn write_author(dir: &Path, name: &str, rows: &[&str]) {
    let mut body = String::new();
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    fs::write(dir.join(name), body).unwrap();
}

/// Three authors, seven valid rows, one row with an invalid age.
pub fn write_sample_corpus(dir: &Path) {
    write_author(
        dir,
        "1.male.15.Aries.csv",
        &[
            "1,male,15,Aries,first post",
            "1,male,15,Aries,\"commas, and\nnewlines inside\"",
            "1,male,15,Aries,I am 15 years old",
        ],
    );
    write_author(
        dir,
        "2.female.23.Leo.csv",
        &[
            "2,female,23,Leo,I am 25 years old!! 😀",
            "2,female,-1,Leo,bad age row",
            "2,female,23,Leo,hello world",
        ],
    );
    write_author(
        dir,
        "3.female.48.Virgo.csv",
        &["3,female,48,Virgo,one", "3,female,48,Virgo,two three"],
    );
}
