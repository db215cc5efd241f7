use clap::{CommandFactory, Parser};
use pipeline_deck::{
    app::App,
    cli::{Cli, Command},
    Result,
};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    match Cli::parse().into_command() {
        Command::Run(opts) => {
            let app = App::from_options(opts)?;
            app.run()
        }
        Command::Render(opts) => {
            println!("{}", opts.to_svg());
            Ok(())
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
