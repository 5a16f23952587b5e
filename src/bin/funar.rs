use std::{env, fs, path::PathBuf, process::ExitCode};

use funar::{
    build_cli_schema, contracts_to_json, extract_contracts_with, typedefs_to_json_schema,
    CliSchema, EcmaParser, ExtractOptions, Extraction, JsDocTagParser, OptionKind, TypeRegistry,
};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

#[derive(Debug, Default)]
struct OutputOptions {
    pretty: bool,
    extract: ExtractOptions,
}

fn main() -> ExitCode {
    let mut args: Vec<String> = env::args().collect();
    let verbose = args.get(1).is_some_and(|a| a == "--verbose" || a == "-v");
    if verbose {
        args.remove(1);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::ERROR
        })
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if args.len() < 3 {
        return Err("not enough arguments".to_string());
    }

    let command = args[1].as_str();
    let file = PathBuf::from(&args[2]);

    match command {
        "contracts" => {
            let options = parse_output_options(&args[3..])?;
            let extraction = extract_file(&file, &options.extract, &mut TypeRegistry::new())?;
            let out = contracts_to_json(&extraction.contracts, options.pretty)
                .map_err(|e| e.to_string())?;
            println!("{out}");
            Ok(())
        }
        "options" => {
            let function = args.get(3).ok_or("options requires a function name")?;
            let options = parse_output_options(&args[4..])?;
            let schema = schema_for(&file, function, &options.extract)?;
            let placement: JsonMap<String, JsonValue> = schema
                .placement
                .iter()
                .map(|(name, var)| (name.clone(), json!(var.path)))
                .collect();
            let out = json!({ "options": schema.options, "placement": placement });
            println!("{}", to_json(&out, options.pretty)?);
            Ok(())
        }
        "call" => {
            let function = args.get(3).ok_or("call requires a function name")?;
            let schema = schema_for(&file, function, &ExtractOptions::default())?;
            let values = parse_call_flags(&args[4..], &schema)?;
            let call_args = schema.mapper().map(&values).map_err(|e| e.to_string())?;
            println!("{}", to_json(&JsonValue::Array(call_args), false)?);
            Ok(())
        }
        "typedefs" => {
            let options = parse_output_options(&args[3..])?;
            let mut registry = TypeRegistry::new();
            extract_file(&file, &options.extract, &mut registry)?;
            let out = typedefs_to_json_schema(&registry, options.pretty).map_err(|e| e.to_string())?;
            println!("{out}");
            Ok(())
        }
        _ => Err(format!("unknown command '{command}'")),
    }
}

fn extract_file(
    file: &PathBuf,
    options: &ExtractOptions,
    registry: &mut TypeRegistry,
) -> Result<Extraction, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {e}", file.display()))?;
    let extraction = extract_contracts_with(&source, registry, options, &EcmaParser, &JsDocTagParser)
        .map_err(|e| e.to_string())?;
    for warning in &extraction.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(extraction)
}

fn schema_for(file: &PathBuf, function: &str, options: &ExtractOptions) -> Result<CliSchema, String> {
    let extraction = extract_file(file, options, &mut TypeRegistry::new())?;
    let contract = extraction
        .contracts
        .iter()
        .find(|c| c.name == function)
        .ok_or_else(|| format!("function '{function}' not found in '{}'", file.display()))?;
    Ok(build_cli_schema(contract))
}

fn to_json(value: &JsonValue, pretty: bool) -> Result<String, String> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(|e| e.to_string())
    } else {
        serde_json::to_string(value).map_err(|e| e.to_string())
    }
}

fn parse_output_options(args: &[String]) -> Result<OutputOptions, String> {
    let mut options = OutputOptions::default();
    for arg in args {
        match arg.as_str() {
            "--pretty" => options.pretty = true,
            "--hoist-typedefs" => options.extract.hoist_typedefs = true,
            other => return Err(format!("unknown option '{other}'")),
        }
    }
    Ok(options)
}

/// Tokenizes function flags against the option schema.
///
/// Accepts `--name value`, `--name=value`, `-s value` and bare boolean
/// flags. Options marked `multiple` collect repeated values into an array.
fn parse_call_flags(args: &[String], schema: &CliSchema) -> Result<JsonMap<String, JsonValue>, String> {
    let mut values = JsonMap::new();
    let mut i = 0usize;

    while i < args.len() {
        let arg = args[i].as_str();
        let (name, inline) = if let Some(long) = arg.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, value)) => (name.to_string(), Some(value.to_string())),
                None => (long.to_string(), None),
            }
        } else if let Some(short) = arg.strip_prefix('-').filter(|s| s.chars().count() == 1) {
            let name = schema
                .options
                .iter()
                .find(|(_, spec)| spec.short.as_deref() == Some(short))
                .map(|(name, _)| name.clone())
                .ok_or_else(|| format!("unknown option '{arg}'"))?;
            (name, None)
        } else {
            return Err(format!("unexpected argument '{arg}'"));
        };

        let spec = schema
            .options
            .get(&name)
            .ok_or_else(|| format!("unknown option '--{name}'"))?;

        let value = match (spec.kind, inline) {
            (OptionKind::Boolean, None) => JsonValue::Bool(true),
            (OptionKind::Boolean, Some(raw)) => match raw.as_str() {
                "true" => JsonValue::Bool(true),
                "false" => JsonValue::Bool(false),
                _ => return Err(format!("option '--{name}' expects true or false, got '{raw}'")),
            },
            (OptionKind::String, Some(raw)) => JsonValue::String(raw),
            (OptionKind::String, None) => {
                i += 1;
                let raw = args
                    .get(i)
                    .ok_or_else(|| format!("missing value for '--{name}'"))?;
                JsonValue::String(raw.clone())
            }
        };
        i += 1;

        if spec.multiple {
            match values
                .entry(name)
                .or_insert_with(|| JsonValue::Array(Vec::new()))
            {
                JsonValue::Array(items) => items.push(value),
                other => *other = JsonValue::Array(vec![value]),
            }
        } else {
            values.insert(name, value);
        }
    }

    Ok(values)
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  funar [--verbose] contracts <file> [--pretty] [--hoist-typedefs]");
    eprintln!("  funar [--verbose] options <file> <function> [--pretty] [--hoist-typedefs]");
    eprintln!("  funar [--verbose] call <file> <function> [--option value | --flag]...");
    eprintln!("  funar [--verbose] typedefs <file> [--pretty] [--hoist-typedefs]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --pretty           indent JSON output");
    eprintln!("  --hoist-typedefs   register every typedef of the file before reading functions");
    eprintln!("  --verbose, -v      log extraction steps to stderr");
}
