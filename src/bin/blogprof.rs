use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    blogprof::apps::run_blogprof(std::env::args().skip(1))
}
