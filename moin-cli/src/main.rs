// Command-line interface for moin-babel
//
// moinconv reads a document in any dialect the library knows, converts it through the
// document tree and writes it out in another dialect. The tree itself can be looked at
// with the inspect command.
//
// Usage:
//  moinconv <input> [--to <format>] [--from <format>] [--output <file>]        - Convert (default)
//  moinconv convert <input> [--to <format>] [--from <format>] [--output <file>] - Same as above
//  moinconv inspect <input> [<view>] [--from <format>]                          - Print the tree
//  moinconv formats                                                             - List formats
//
// The source format is detected from the file extension unless --from is given. Both
// --from and --to take a format name (`moinwiki`) or a media type (`text/x.moin.wiki`).
// When --to is missing the `convert.default_output` setting is used.
//
// Extra Parameters:
//
// Serializer options are passed with --extra-<name> <value>; the "extra-" prefix is
// stripped and the pair handed to the output format. A few names configure the input
// side instead: `delimiter` (csv), `extensions` (markdown), `lexer` (highlight) and
// `item` (zip, tar: the item member links point at, the input file name by default).
// Example:
//  moinconv page.moin --to html --extra-standalone true --extra-title "Front Page"

mod views;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use moin_babel::{Arguments, ConverterRegistry, Element, HostConfig};
use moin_config::{Loader, MoinConfig};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Extra parameters that configure the reader rather than the writer
const INPUT_PARAMETERS: &[&str] = &["delimiter", "extensions", "lexer", "item"];

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if let Some(key) = arg.strip_prefix("--extra-") {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with('-'));
            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

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
        .long_help(
            "Source format to convert from, as a format name or a media type.\n\n\
            If not specified, the format is auto-detected from the file extension.",
        )
        .value_hint(ValueHint::Other)
}

fn build_cli() -> Command {
    Command::new("moinconv")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert documents between MoinMoin markup and other formats")
        .long_about(
            "moinconv converts wiki markup (MoinMoin, Creole, MediaWiki), Markdown,\n\
            reStructuredText, DocBook, HTML, CSV and source code through one document\n\
            tree and writes it as MoinMoin, Markdown, reStructuredText, DocBook, HTML or text.\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to pass format-specific options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            moinconv page.moin --to markdown              # Convert to markdown (stdout)\n  \
            moinconv page.md --to html -o page.html       # Convert to an HTML file\n  \
            moinconv inspect page.moin                    # Show the document tree",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
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
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (defaults to convert.default_output)")
                        .value_hint(ValueHint::Other),
                )
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
                        .help("How to print the tree. Defaults to 'xml'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            views::AVAILABLE_VIEWS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                )
                .arg(from_arg()),
        )
        .subcommand(Command::new("formats").about("List the registered formats and passes"))
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);

    // A bare file argument means "convert".
    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            let first = cleaned_args.get(1).map(String::as_str);
            match first {
                Some(first)
                    if !first.starts_with('-')
                        && !matches!(first, "convert" | "inspect" | "formats" | "help") =>
                {
                    let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                    new_args.extend_from_slice(&cleaned_args[1..]);
                    match cli.try_get_matches_from(&new_args) {
                        Ok(m) => m,
                        Err(e2) => e2.exit(),
                    }
                }
                _ => e.exit(),
            }
        }
    };

    let mut config = load_cli_config(matches.get_one::<String>("config").map(String::as_str));
    let registry = ConverterRegistry::with_defaults();

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            if sub_matches.get_flag("expand-nowiki") {
                config.convert.expand_nowiki = true;
            }
            if sub_matches.get_flag("smileys") {
                config.convert.smileys = true;
            }
            apply_config_overrides(&mut config, &mut extra_params);
            handle_convert_command(&registry, sub_matches, &extra_params, &config);
        }
        Some(("inspect", sub_matches)) => {
            apply_config_overrides(&mut config, &mut extra_params);
            handle_inspect_command(&registry, sub_matches, &extra_params, &config);
        }
        Some(("formats", _)) => handle_formats_command(&registry),
        _ => fail("Unknown subcommand. Use --help for usage information."),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// Resolve `--from`, falling back to the file extension.
fn source_format(registry: &ConverterRegistry, matches: &ArgMatches, input: &str) -> String {
    if let Some(from) = matches.get_one::<String>("from") {
        return from.clone();
    }
    registry.detect_format_from_filename(input).unwrap_or_else(|| {
        fail(&format!(
            "Could not detect format from filename '{input}'. Please specify --from explicitly"
        ))
    })
}

fn read_and_parse(
    registry: &ConverterRegistry,
    matches: &ArgMatches,
    extra_params: &HashMap<String, String>,
    config: &MoinConfig,
) -> Element {
    let input = matches
        .get_one::<String>("input")
        .map(String::as_str)
        .unwrap_or_else(|| fail("an input file is required"));
    let from = source_format(registry, matches, input);
    let content_type = registry
        .input_type(&from)
        .unwrap_or_else(|e| fail(&e.to_string()));

    let data = fs::read(input).unwrap_or_else(|e| fail(&format!("reading file '{input}': {e}")));
    let host = HostConfig::from(&config.host);
    let arguments = parse_arguments(config, &from, input, extra_params);
    tracing::debug!(%content_type, ?arguments, "parsing input");

    registry
        .parse_bytes(&data, &content_type, &host, &arguments)
        .unwrap_or_else(|e| fail(&e.to_string()))
}

/// Handle the convert command
fn handle_convert_command(
    registry: &ConverterRegistry,
    matches: &ArgMatches,
    extra_params: &HashMap<String, String>,
    config: &MoinConfig,
) {
    let to = matches
        .get_one::<String>("to")
        .cloned()
        .unwrap_or_else(|| config.convert.default_output.clone());
    let output_type = registry
        .output_type(&to)
        .unwrap_or_else(|e| fail(&e.to_string()));

    let doc = read_and_parse(registry, matches, extra_params, config);

    let options = serializer_options(config, &to, extra_params);
    let result = registry
        .serialize(&doc, &output_type, &options)
        .unwrap_or_else(|e| fail(&e.to_string()));

    match matches.get_one::<String>("output") {
        Some(path) => {
            fs::write(path, result)
                .unwrap_or_else(|e| fail(&format!("writing file '{path}': {e}")));
        }
        None => print!("{result}"),
    }
}

/// Handle the inspect command
fn handle_inspect_command(
    registry: &ConverterRegistry,
    matches: &ArgMatches,
    extra_params: &HashMap<String, String>,
    config: &MoinConfig,
) {
    let view = matches
        .get_one::<String>("view")
        .map(String::as_str)
        .unwrap_or("xml");
    let doc = read_and_parse(registry, matches, extra_params, config);
    let output = views::render_view(&doc, view).unwrap_or_else(|e| fail(&e));
    print!("{output}");
}

/// Handle the formats command
fn handle_formats_command(registry: &ConverterRegistry) {
    println!("Formats:");
    for format in registry.formats() {
        let direction = match (format.supports_parsing(), format.supports_serialization()) {
            (true, true) => "in/out",
            (true, false) => "in",
            (false, true) => "out",
            (false, false) => "-",
        };
        let extensions: Vec<String> = format
            .file_extensions()
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect();
        println!(
            "  {:<12} {:<7} {}",
            format.name(),
            direction,
            format.description()
        );
        let types: Vec<String> = format
            .input_types()
            .iter()
            .chain(format.output_types().iter())
            .map(ToString::to_string)
            .fold(Vec::new(), |mut seen, t| {
                if !seen.contains(&t) {
                    seen.push(t);
                }
                seen
            });
        println!("  {:<20} types: {}", "", types.join(", "));
        if !extensions.is_empty() {
            println!("  {:<20} files: {}", "", extensions.join(" "));
        }
    }

    println!("\nPasses:");
    for transform in registry.transforms() {
        println!("  {:<12} {}", transform.name(), transform.description());
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> MoinConfig {
    let loader = Loader::new().with_local_file();
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader
        .build()
        .unwrap_or_else(|err| fail(&format!("Failed to load configuration: {err}")))
}

/// Move extras that mirror configuration keys into the configuration.
fn apply_config_overrides(config: &mut MoinConfig, extra_params: &mut HashMap<String, String>) {
    if let Some(delimiter) = extra_params.remove("delimiter") {
        config.formats.csv.delimiter = delimiter;
    }
    if let Some(extensions) = extra_params.remove("extensions") {
        config.formats.markdown.extensions = extensions
            .split(',')
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
    }
    if let Some(raw) = extra_params.remove("lineno") {
        config.host.add_lineno = parse_bool_arg("lineno", &raw);
    }
}

/// Options for the reader and the document passes.
fn parse_arguments(
    config: &MoinConfig,
    from: &str,
    input: &str,
    extra_params: &HashMap<String, String>,
) -> Arguments {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if config.convert.expand_nowiki {
        pairs.push(("nowiki", "expandall".to_string()));
    }
    if config.convert.smileys {
        pairs.push(("icon", "smiley".to_string()));
    }
    match from {
        "csv" => {
            if let Some(delimiter) = config.formats.csv.delimiter() {
                pairs.push(("delimiter", delimiter.to_string()));
            }
        }
        "markdown" => pairs.push(("extensions", config.formats.markdown.extensions.join(","))),
        "highlight" => {
            let lexer = extra_params.get("lexer").cloned().or_else(|| {
                Path::new(input)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_string)
            });
            if let Some(lexer) = lexer {
                pairs.push(("lexer", lexer));
            }
        }
        "zip" | "tar" => {
            let item = extra_params.get("item").cloned().or_else(|| {
                Path::new(input)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .filter(|name| *name != "-")
                    .map(str::to_string)
            });
            if let Some(item) = item {
                pairs.push(("item", item));
            }
        }
        _ => {}
    }
    Arguments::from_keywords(pairs.iter().map(|(k, v)| (*k, v.as_str())))
}

/// Options for the writer: configuration first, then every --extra-* not meant for the reader.
fn serializer_options(
    config: &MoinConfig,
    to: &str,
    extra_params: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut options = HashMap::new();
    if to == "html" && config.formats.html.standalone {
        options.insert("standalone".to_string(), "true".to_string());
    }
    for (key, value) in extra_params {
        if !INPUT_PARAMETERS.contains(&key.as_str()) {
            options.insert(key.clone(), value.clone());
        }
    }
    options
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => fail(&format!("Invalid boolean value '{other}' for --extra-{flag}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_extra_args_empty() {
        let args = args(&["moinconv", "inspect", "page.moin"]);
        let (cleaned, extra) = parse_extra_args(&args);

        assert_eq!(cleaned, args);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_parse_extra_args_mixed_with_regular_args() {
        let (cleaned, extra) = parse_extra_args(&args(&[
            "moinconv",
            "convert",
            "page.moin",
            "--to",
            "html",
            "--extra-title",
            "Front",
            "--from",
            "moinwiki",
        ]));

        assert_eq!(
            cleaned,
            args(&["moinconv", "convert", "page.moin", "--to", "html", "--from", "moinwiki"])
        );
        assert_eq!(extra.len(), 1);
        assert_eq!(extra.get("title"), Some(&"Front".to_string()));
    }

    #[test]
    fn test_parse_extra_args_boolean_flag() {
        let (cleaned, extra) = parse_extra_args(&args(&[
            "moinconv",
            "page.moin",
            "--extra-standalone",
            "--extra-delimiter",
            ",",
        ]));

        assert_eq!(cleaned, args(&["moinconv", "page.moin"]));
        assert_eq!(extra.get("standalone"), Some(&"true".to_string()));
        assert_eq!(extra.get("delimiter"), Some(&",".to_string()));
    }

    #[test]
    fn config_overrides_consume_reader_settings() {
        let mut config = load_cli_config(None);
        let mut extras = HashMap::from([
            ("delimiter".to_string(), ",".to_string()),
            ("extensions".to_string(), "table, tasklist".to_string()),
            ("title".to_string(), "Front".to_string()),
        ]);

        apply_config_overrides(&mut config, &mut extras);

        assert_eq!(config.formats.csv.delimiter(), Some(','));
        assert_eq!(config.formats.markdown.extensions, vec!["table", "tasklist"]);
        assert_eq!(extras.len(), 1);
    }

    #[test]
    fn parse_arguments_follow_format_and_config() {
        let mut config = load_cli_config(None);
        config.convert.smileys = true;
        let none = HashMap::new();

        let wiki = parse_arguments(&config, "moinwiki", "page.moin", &none);
        assert_eq!(wiki.get("nowiki"), Some("expandall"));
        assert_eq!(wiki.get("icon"), Some("smiley"));
        assert_eq!(wiki.get("lexer"), None);

        let code = parse_arguments(&config, "highlight", "script.py", &none);
        assert_eq!(code.get("lexer"), Some("py"));

        config.convert.expand_nowiki = false;
        let csv = parse_arguments(&config, "csv", "data.csv", &none);
        assert_eq!(csv.get("nowiki"), None);
        assert_eq!(csv.get("delimiter"), None);

        let archive = parse_arguments(&config, "zip", "uploads/site.zip", &none);
        assert_eq!(archive.get("item"), Some("site.zip"));
        let named = HashMap::from([("item".to_string(), "Files/site".to_string())]);
        assert_eq!(parse_arguments(&config, "tar", "-", &named).get("item"), Some("Files/site"));
        assert_eq!(parse_arguments(&config, "tar", "-", &none).get("item"), None);
    }

    #[test]
    fn serializer_options_skip_reader_parameters() {
        let mut config = load_cli_config(None);
        config.formats.html.standalone = true;
        let extras = HashMap::from([
            ("lexer".to_string(), "py".to_string()),
            ("title".to_string(), "Front".to_string()),
        ]);

        let html = serializer_options(&config, "html", &extras);
        assert_eq!(html.get("standalone"), Some(&"true".to_string()));
        assert_eq!(html.get("title"), Some(&"Front".to_string()));
        assert!(!html.contains_key("lexer"));

        let markdown = serializer_options(&config, "markdown", &HashMap::new());
        assert!(markdown.is_empty());
    }
}
