use abacus_cli::input::Input;
use abacus_cli::runner::Runner;
use clap::{Arg, ArgAction, Command, ValueHint};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("ABACUS_LOG", "error,abacus=info"))
        .init();

    let matches = Command::new("abacus")
        .version(clap::crate_version!())
        .about("Combine protein identifications from multiple experiments into one report")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("dataset_dirs")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Directories holding one dataset's validation output each. Overrides \
                     the datasets listed in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where persisted models and the report will be written. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("fasta")
                .short('f')
                .long("fasta")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to FASTA database used for cluster descriptions. Overrides the \
                     FASTA file specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("clusters")
                .long("clusters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to a CD-HIT `.clstr` file grouping proteins into clusters")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("annotation")
                .long("annotation")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to a tab-delimited file with extra columns per protein id")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("razor")
                .long("razor")
                .action(ArgAction::SetTrue)
                .help("Count only unique and razor peptide ions"),
        )
        .arg(
            Arg::new("picked")
                .long("picked")
                .action(ArgAction::SetTrue)
                .help("Only aggregate proteins that won their target/decoy competition"),
        )
        .arg(
            Arg::new("unique-only")
                .long("unique-only")
                .action(ArgAction::SetTrue)
                .help("Only unique peptides contribute to reported label intensities"),
        )
        .arg(
            Arg::new("labels")
                .long("labels")
                .action(ArgAction::SetTrue)
                .help("Report summed label intensities per cluster"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;

    let runner = input.build().and_then(Runner::new)?;

    runner.run()?;

    Ok(())
}
