use clap::Parser;

mod commands;
mod output;

use commands::run;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "ci-runner")]
#[command(version = VERSION)]
#[command(about = "Run the CI pipeline for a libos across a server and a client host")]
struct Cli {
    #[command(flatten)]
    run: run::RunArgs,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let result = run::run(cli.run);
    let (json_result, exit_code) = output::map_cmd_result_to_json(result);
    output::print_json_result(json_result, exit_code);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
