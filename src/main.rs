use image_label_inspect::cli::{Args, Command, InspectRequest, Runner};
use image_label_inspect::common::Context;
use image_label_inspect::error::InspectError;
use image_label_inspect::logging::Logger;
use image_label_inspect::registry::DockerTransport;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();
    let output = Logger::new(args.verbose);
    output.debug(&format!(
        "{} {} starting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));

    match run(args, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, output: &Logger) -> Result<(), InspectError> {
    match args.command {
        Command::Inspect { image_references } => {
            let request = InspectRequest::from_args(&image_references)?;
            let transport = DockerTransport::new(output.clone());
            let runner = Runner::new(&transport, output.clone());

            runner
                .inspect(&Context::background(), &request, &mut std::io::stdout())
                .await?;
            Ok(())
        }
    }
}
