mod app;
mod cli;
mod screen;

use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "tog".to_string());

    match cli::run(&program, &args[1..]) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{program}: {e}");
            process::exit(1);
        }
    }
}
