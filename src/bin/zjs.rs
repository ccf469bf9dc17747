// zjs CLI
// Usage: zjs [--config FILE] <tree|demo>

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::process;

use zjs_core::config::CONFIG_FILE;
use zjs_core::vm::EntrySnapshot;
use zjs_core::{Function, Members, Runtime, RuntimeConfig, Value, ZjsError};

/// zjs - namespaces, classes and mixin chains
#[derive(Parser)]
#[command(name = "zjs")]
#[command(author = "starssxproject")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect the zjs object model", long_about = None)]
struct Cli {
    /// Config file (defaults to ./zjs.json when present)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the namespace registry
    Tree {
        /// Emit JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Build a small mixin chain and run it
    Demo,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        if !config.color {
            colored::control::set_override(false);
        }
        match cli.command {
            Commands::Tree { json } => cmd_tree(config, json),
            Commands::Demo => cmd_demo(config),
        }
    });

    if let Err(msg) = result {
        eprintln!("{} {}", "ERR".red().bold(), msg);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, String> {
    match path {
        Some(path) => RuntimeConfig::load(path).map_err(|e| e.to_string()),
        None => {
            let default = Path::new(CONFIG_FILE);
            if default.exists() {
                RuntimeConfig::load(default).map_err(|e| e.to_string())
            } else {
                Ok(RuntimeConfig::default())
            }
        }
    }
}

fn cmd_tree(config: RuntimeConfig, json: bool) -> Result<(), String> {
    let rt = Runtime::with_config(config);
    print_registry(&rt, json)
}

fn print_registry(rt: &Runtime, json: bool) -> Result<(), String> {
    let snapshot = rt.snapshot(rt.root());

    if json {
        let out = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }

    use ptree::TreeBuilder;

    let mut tree = TreeBuilder::new("<root>".to_string());
    for child in &snapshot.children {
        build_entry_tree(&mut tree, child);
    }
    let tree = tree.build();
    ptree::print_tree(&tree).map_err(|e| e.to_string())?;
    Ok(())
}

// Build registry tree using ptree TreeBuilder
fn build_entry_tree(tree: &mut ptree::TreeBuilder, entry: &EntrySnapshot) {
    let label = format!("{} {}", entry.kind.cyan(), entry.fullname);
    if entry.children.is_empty() {
        tree.add_empty_child(label);
        return;
    }
    tree.begin_child(label);
    for child in &entry.children {
        build_entry_tree(tree, child);
    }
    tree.end_child();
}

fn cmd_demo(config: RuntimeConfig) -> Result<(), String> {
    let rt = Runtime::with_config(config);
    let result = run_demo(&rt).map_err(|e| e.format())?;
    print_registry(&rt, false)?;
    println!();
    println!("{} {}", "calc(19) =".green().bold(), result);
    Ok(())
}

fn run_demo(rt: &Runtime) -> Result<Value, ZjsError> {
    let step = |label: &'static str, priority: i32, op: fn(f64) -> f64| {
        Function::native("calc", move |rt, this, args| {
            let inner = rt.call_super(args, this)?;
            let value = op(inner.as_number().unwrap_or(args.number(0)));
            println!("  {:<5} -> {}", label, value);
            Ok(Value::from(value))
        })
        .with_priority(priority)
    };

    let num = rt.define_class(
        None,
        Members::new().method(
            "calc",
            Function::native("calc", |_, _, args| {
                println!("  {:<5} -> {}", "num", args.get(0));
                Ok(args.get(0))
            }),
        ),
    );
    let calc = rt.define_class(Some(&num), Members::new().method("calc", step("base", 0, |n| n * 2.0)));
    rt.mixin(&calc, Some("inc"), Members::new().method("calc", step("inc", 1, |n| n + 1.0)));
    rt.mixin(&calc, Some("add2"), Members::new().method("calc", step("add2", -1, |n| n + 2.0)));
    rt.declare(
        "demo",
        vec![("Num", Value::Class(num)), ("Calc", Value::Class(calc.clone()))],
    )?;

    println!("{}", "Chain (innermost first):".bold());
    let obj = rt.construct(&calc, &[])?;
    rt.invoke(&obj, "calc", &[Value::from(19)])
}
