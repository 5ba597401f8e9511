//! # tte

use tte::{Config, Editor, Error, dlog::DebugLog};

/// Parse the command line, initialize the editor and run the program,
/// optionally opening a file if an argument is given. When `TTE_DEBUG` is
/// set, debug traces accumulate in memory and are flushed to `tte.log` on
/// exit — fatal exits included.
///
/// # Errors
///
/// Any error that occurs during the execution of the program will be returned
/// by this function.
fn main() -> Result<(), Error> {
    let mut args = std::env::args();
    let result = match (args.nth(1), /* remaining_args = */ args.len()) {
        (Some(arg), 0) if arg == "--version" => {
            println!("tte {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        (Some(arg), 0) if arg.starts_with('-') => Err(Error::UnrecognizedOption(arg)),
        (file_name, 0) => run(file_name),
        (_, _) => Err(Error::TooManyArguments(std::env::args().collect())),
    };
    // Flush pending debug lines on every exit path, fatal ones included.
    log::logger().flush();
    result
}

fn run(file_name: Option<String>) -> Result<(), Error> {
    if std::env::var_os("TTE_DEBUG").is_some() {
        DebugLog::install("tte.log").ok();
    }
    Editor::new(Config::default())?.run(file_name.as_deref())
}
