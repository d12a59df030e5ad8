use chipvm::cli::{self, USAGE};

fn main() {
    env_logger::init();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{}\n\n{}", err, USAGE);
            std::process::exit(2);
        }
    };

    if let Err(err) = chipvm::run(command) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
