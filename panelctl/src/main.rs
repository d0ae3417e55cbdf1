use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match panelctl::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                panelctl::EXIT_USAGE
            } else {
                0
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(err) = panelctl::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
