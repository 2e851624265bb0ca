use clap::Parser;
use ftso_script::config::FeedArgs;
use std::process::ExitCode;

/// Print the 21-byte feed id for a category and name.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    feed: FeedArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match args.feed.selector().feed_id() {
        Ok(id) => {
            println!("{id}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
