use colored::Colorize;
use kick::cli::App;
use std::process;

fn main() {
    let app = App::from_args();

    if let Err(e) = app.run() {
        if !app.is_quiet() {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        process::exit(1);
    }
}
