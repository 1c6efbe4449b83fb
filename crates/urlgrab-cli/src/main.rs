use urlgrab_core::logging;

mod cli;

fn main() {
    // Initialize logging as early as possible; stdout is reserved for the
    // single JSON result, so logs go to the state-dir file or stderr.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    std::process::exit(cli::run_from_args());
}
