use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the views from src/views.rs
// We need to duplicate this here since build scripts can't access src/ modules
const AVAILABLE_VIEWS: &[&str] = &["xml", "compact", "json", "outline"];

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn from_arg() -> Arg {
    Arg::new("from")
        .long("from")
        .help("Source format (auto-detected from file extension if not specified)")
        .value_hint(ValueHint::Other)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("moinconv")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert documents between MoinMoin markup and other formats")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a moin.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .arg(input_arg())
                .arg(from_arg())
                .arg(Arg::new("to").long("to").help("Target format").value_hint(ValueHint::Other))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("expand-nowiki")
                        .long("expand-nowiki")
                        .help("Replace nowiki sections with the output of the language they name")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("smileys")
                        .long("smileys")
                        .help("Turn text smileys into icons")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the document tree of a file")
                .arg(input_arg())
                .arg(
                    Arg::new("view")
                        .help("How to print the tree")
                        .value_parser(clap::builder::PossibleValuesParser::new(AVAILABLE_VIEWS))
                        .index(2)
                        .value_hint(ValueHint::Other),
                )
                .arg(from_arg()),
        )
        .subcommand(Command::new("formats").about("List the registered formats and passes"));

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "moinconv", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "moinconv", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "moinconv", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
