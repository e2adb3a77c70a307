//! scour 命令行入口
//!
//! 薄壳：解析参数、初始化日志，然后把一切交给引擎。
//! 用法见 print_usage

mod logging;

use scour::models::{MatchOptions, ReplacementScope, SelectionSet};
use scour::services::config::EngineConfig;
use scour::services::replace::{ReplacementEngine, ResultReconciler};
use scour::services::search::SearchSession;
use scour::services::vault::{LocalVault, VaultProvider};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

const CONFIG_FILE: &str = ".scour.json";

struct Cli {
    root: String,
    query: String,
    options: MatchOptions,
    replace: Option<String>,
}

fn print_usage() {
    eprintln!("usage: scour [flags] <root> <query>");
    eprintln!();
    eprintln!("flags:");
    eprintln!("  -c, --case-sensitive   match case exactly");
    eprintln!("  -w, --word             whole-word matching");
    eprintln!("  -p, --pattern          treat query as a regex pattern");
    eprintln!("  -m, --multiline        pattern may span lines (with --pattern)");
    eprintln!("  -r, --replace <text>   replace every match across the vault");
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut options = MatchOptions::new();
    let mut replace = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-c" | "--case-sensitive" => options.case_sensitive = true,
            "-w" | "--word" => options.whole_word = true,
            "-p" | "--pattern" => options.use_pattern = true,
            "-m" | "--multiline" => options.multiline = true,
            "-r" | "--replace" => {
                let Some(template) = iter.next() else {
                    return Err("--replace requires a template argument".to_string());
                };
                replace = Some(template.clone());
            }
            "-h" | "--help" => return Err(String::new()),
            other if other.starts_with('-') => {
                return Err(format!("unknown flag: {}", other));
            }
            other => positional.push(other.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(root), Some(query)) = (positional.next(), positional.next()) else {
        return Err("expected <root> and <query>".to_string());
    };
    if positional.next().is_some() {
        return Err("too many arguments".to_string());
    }

    Ok(Cli {
        root,
        query,
        options,
        replace,
    })
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let vault = Arc::new(LocalVault::open(&cli.root)?);
    let config = EngineConfig::load_or_default(&vault.root().join(CONFIG_FILE));

    let mut session = SearchSession::new(
        Arc::clone(&vault) as Arc<dyn VaultProvider>,
        config.clone(),
    );
    let outcome = session.search(&cli.query, &cli.options).await?;

    for record in &outcome.records {
        println!(
            "{}:{}:{}: {}",
            record.doc,
            record.line + 1,
            record.column.map(|c| c + 1).unwrap_or(1),
            record.line_text
        );
    }
    if outcome.records.len() < outcome.total_matches {
        println!(
            "{} of {} matches shown ({} documents scanned)",
            outcome.records.len(),
            outcome.total_matches,
            outcome.documents_scanned
        );
    } else {
        println!(
            "{} matches in {} documents scanned",
            outcome.total_matches, outcome.documents_scanned
        );
    }

    let Some(template) = cli.replace else {
        return Ok(());
    };

    let engine = ReplacementEngine::new(Arc::clone(&vault) as Arc<dyn VaultProvider>);
    let report = engine
        .replace(
            &outcome.records,
            &ReplacementScope::Corpus,
            &template,
            &cli.options,
        )
        .await?;
    println!(
        "replaced {} matches in {} documents",
        report.diff.total_replacements,
        report.diff.documents_modified.len()
    );
    for (doc, error) in &report.failures {
        eprintln!("scour: {}: {}", doc, error);
    }

    let reconciler = ResultReconciler::new(
        Arc::clone(&vault) as Arc<dyn VaultProvider>,
        config.rescan_multiplier,
    );
    match reconciler.reconcile(outcome.records, SelectionSet::new(), report.diff) {
        Ok((remaining, _)) => println!("{} matches remain", remaining.len()),
        Err(_) => {
            let outcome = session.search(&cli.query, &cli.options).await?;
            println!("{} matches remain (rescanned)", outcome.total_matches);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let _logging = logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("scour: {}", message);
            }
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("scour: failed to build runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scour: {}", e);
            ExitCode::FAILURE
        }
    }
}
