use clap::{Parser, ValueEnum};
use prec::context::RuleKind;
use prec::{parser::write_ntriples, Context, Converter, Vocab};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
struct ContextArgs {
    /// Path to the context document (Turtle-star)
    #[arg(short, long, value_name = "FILE")]
    context: PathBuf,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    #[clap(flatten)]
    context: ContextArgs,

    /// Path to the generic property-graph dump (Turtle-star)
    #[arg(short, long, value_name = "FILE")]
    graph: PathBuf,
}

#[derive(ValueEnum, Clone, Debug, Default)]
enum ApplyOutputFormat {
    #[default]
    NTriples,
    Dump,
}

#[derive(Parser)]
struct ApplyArgs {
    #[clap(flatten)]
    common: CommonArgs,

    /// The output format for the converted dataset
    #[arg(long, value_enum, default_value_t = ApplyOutputFormat::NTriples)]
    format: ApplyOutputFormat,
}

#[derive(Parser)]
struct RulesArgs {
    #[clap(flatten)]
    context: ContextArgs,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Apply a context to a property-graph dump and print the result
    Apply(ApplyArgs),
    /// Parse a context and print its rules in application order
    Rules(RulesArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply(args) => {
            let converter = Converter::from_files(
                &args.common.context.context.to_string_lossy(),
                &args.common.graph.to_string_lossy(),
            )?;
            let output = converter.convert()?;
            match args.format {
                ApplyOutputFormat::NTriples => print!("{}", write_ntriples(&output)),
                ApplyOutputFormat::Dump => {
                    let mut quads: Vec<String> =
                        output.iter().map(|q| format!("{:?}", q)).collect();
                    quads.sort();
                    for quad in quads {
                        println!("{}", quad);
                    }
                }
            }
        }
        Commands::Rules(args) => {
            let voc = Vocab::new();
            let source = fs::read_to_string(&args.context.context)?;
            let context = Context::parse(&source, &voc)?;
            for kind in [RuleKind::Edge, RuleKind::Property, RuleKind::NodeLabel] {
                println!("{:?} rules:", kind);
                let rules = context.rules_for(kind);
                if rules.is_empty() {
                    println!("  (none; default template {})", context.default_template(kind).name);
                    continue;
                }
                for rule in rules {
                    let priority = match rule.priority.explicit() {
                        Some(p) => format!("priority {}", p),
                        None => format!("{} condition(s)", rule.conditions.len()),
                    };
                    println!(
                        "  {} [{}] -> template {}",
                        rule.node, priority, rule.template.name
                    );
                    for condition in &rule.conditions {
                        println!("    where {}", condition.key);
                    }
                }
            }
        }
    }
    Ok(())
}
