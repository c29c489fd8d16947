use common::config::DEFAULT_CONFIG_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch, score and write the output CSV.
    Run,
    /// Fetch and print per-wallet feature vectors without scoring.
    Features,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: Command,
    pub config_path: String,
}

pub fn parse_args<I>(mut args: I) -> std::result::Result<Cli, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let mut command = None;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = args
                    .next()
                    .ok_or_else(|| "usage: scorer [run|features] [--config <path>]".to_string())?;
            }
            "run" | "features" if command.is_some() => {
                return Err(format!("unexpected argument: {arg}"));
            }
            "run" => command = Some(Command::Run),
            "features" => command = Some(Command::Features),
            other => return Err(format!("unknown command: {other}")),
        }
    }

    Ok(Cli {
        command: command.unwrap_or(Command::Run),
        config_path,
    })
}
