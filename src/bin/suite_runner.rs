//! Suite Runner CLI
//!
//! Runs JSON-Schema-Test-Suite cases and inspects reference resolution.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schema_ref_harness::{
    fixture, CompositeResolver, EncodedFixture, HarnessConfig, ResolutionContext, SchemaLoader,
    SuiteDraft, SuiteRunner,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "suite-runner")]
#[command(about = "Run JSON-Schema-Test-Suite cases and resolve $ref URIs")]
struct Cli {
    /// Config file (layered over harness.toml and HARNESS__* variables)
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the JSON-Schema-Test-Suite checkout
    #[arg(short, long)]
    suite_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every case for a draft
    Run {
        /// Draft to run (draft4, draft6, draft7)
        #[arg(short, long)]
        draft: Option<SuiteDraft>,
        /// Only run groups whose description matches this regex
        #[arg(short, long)]
        filter: Option<String>,
        /// Include tests/<draft>/optional
        #[arg(long)]
        optional: bool,
        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the raw bytes behind a URI
    Resolve {
        uri: String,
    },

    /// Load a URI, applying its fragment
    Load {
        uri: String,
        /// Load every document reachable through $ref instead
        #[arg(long)]
        closure: bool,
    },

    /// List registered meta-schemas
    List,

    /// Decode a base64 fixture document
    Decode {
        /// Encoded text; read from stdin when omitted
        encoded: Option<String>,
    },

    /// Validate an encoded fixture file (schema + document)
    Check {
        fixture: PathBuf,
        #[arg(short, long)]
        draft: Option<SuiteDraft>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = HarnessConfig::load_from(cli.config.as_deref())?;
    if let Some(root) = cli.suite_root {
        config.suite.root = root;
    }

    match cli.command {
        Commands::Run { draft, filter, optional, output } => {
            if let Some(draft) = draft {
                config.suite.draft = draft;
            }
            if let Some(filter) = filter {
                config.suite.filter = Some(filter);
            }
            config.suite.include_optional |= optional;

            let runner = SuiteRunner::from_config(&config)?;
            println!("🔍 Running {} cases from {:?}", runner.draft(), config.suite_root());

            let report = runner.run(&config.suite_root())?;

            for failure in report.failures() {
                println!(
                    "❌ {} / {} / {} (expected {})",
                    failure.file,
                    failure.group,
                    failure.case,
                    if failure.expected { "valid" } else { "invalid" }
                );
            }
            for errored in report.errors() {
                println!(
                    "⚠️  {} / {} / {}: {}",
                    errored.file,
                    errored.group,
                    errored.case,
                    errored.error.as_deref().unwrap_or("unknown error")
                );
            }

            println!();
            println!("{}/{} cases passed", report.passed(), report.total());

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
                println!("✅ Report written to {:?}", path);
            }

            if !report.all_passed() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Resolve { uri } => {
            let resolver = CompositeResolver::from_config(&config)?;
            let ctx = ResolutionContext::root(config.resolver.max_depth);
            let reference = ctx.reference(&uri)?;
            let bytes = resolver.resolve_bytes(&ctx, &reference)?;
            io::stdout().write_all(&bytes)?;
            Ok(())
        }

        Commands::Load { uri, closure } => {
            let resolver = CompositeResolver::from_config(&config)?;
            let loader = SchemaLoader::new(Arc::new(resolver))
                .with_max_depth(config.resolver.max_depth);

            if closure {
                let documents = loader.load_closure(&uri)?;
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&loader.load(&uri)?)?);
            }
            Ok(())
        }

        Commands::List => {
            let resolver = CompositeResolver::from_config(&config)?;
            println!("📚 Registered documents ({}):", resolver.registry().len());
            for doc in resolver.registry().documents() {
                println!("  {}  {}", doc.checksum().short(), doc.uri());
            }
            println!();
            println!(
                "Configured draft: {} ({})",
                config.suite.draft,
                config.suite.draft.meta_schema_uri()
            );
            println!("Local fixture authority: {}", resolver.route().local_authority());
            Ok(())
        }

        Commands::Decode { encoded } => {
            let encoded = match encoded {
                Some(text) => text,
                None => {
                    let mut text = String::new();
                    io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let value = fixture::decode_json(&encoded)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }

        Commands::Check { fixture: path, draft } => {
            if let Some(draft) = draft {
                config.suite.draft = draft;
            }
            let decoded = EncodedFixture::from_file(&path)?.decode()?;
            let runner = SuiteRunner::from_config(&config)?;
            let valid = runner.check_fixture(&decoded)?;

            match decoded.valid {
                Some(expected) if expected != valid => {
                    println!("❌ {:?}: validator said {}, fixture expects {}", path, valid, expected);
                    std::process::exit(1);
                }
                _ => println!("✅ {:?}: {}", path, if valid { "valid" } else { "invalid" }),
            }
            Ok(())
        }
    }
}
