use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use docdelta_builder::{Mutation, PersistOutcome, UpdateBuilder};
use docdelta_diff::{unified, ChangeAudit};
use docdelta_store::{apply_update, InMemoryBackend};
use docdelta_types::OperatorDocument;
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");
    match cli.command {
        Command::Compile(args) => cmd_compile(args, &config, cli.format),
        Command::Apply(args) => cmd_apply(args, cli.format),
        Command::Demo(args) => cmd_demo(args, &config, cli.format),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn cmd_compile(args: CompileArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let document = read_json(&args.document)?;
    let script: Vec<Mutation> = serde_json::from_value(read_json(&args.mutations)?)
        .with_context(|| format!("reading mutations from {}", args.mutations.display()))?;
    let dialect = config.dialect_or(args.dialect);

    let mut builder = if args.new {
        UpdateBuilder::create(document, config.builder.clone())?
    } else {
        UpdateBuilder::load(document, config.builder.clone())?
    };
    builder.apply_all(&script)?;
    debug!(id = %builder.id(), mutations = script.len(), "script applied");

    let update = builder.query();
    let conflicts = update.conflicting_paths();

    if format == OutputFormat::Json {
        let report = json!({
            "id": builder.id().to_string(),
            "isNew": builder.is_new(),
            "value": builder.value(),
            "update": update.render(dialect),
            "modifiedPaths": builder.modified_paths(),
            "conflicts": conflicts.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "audit": builder.audit(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {} ({} mutations)", "Document".bold(), builder.id().to_string().cyan(), script.len());
    println!("{:#}", builder.value());
    if builder.is_new() {
        println!("\n{} new document, inserted whole on first persist", "Update:".bold());
    } else if update.is_empty() {
        println!("\n{} nothing to persist", "Update:".bold());
    } else {
        println!("\n{} {} entries", "Update:".bold(), update.len());
        println!("{:#}", update.render(dialect));
    }
    for conflict in &conflicts {
        println!("  {} {}", "conflict:".yellow().bold(), conflict);
    }
    if args.show_diff {
        print_diff(builder.reference(), &builder.value(), ("reference", "working"));
        if !builder.is_new() {
            print_audit(&builder.audit());
        }
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut document = read_json(&args.document)?;
    let update: OperatorDocument = serde_json::from_value(read_json(&args.update)?)
        .with_context(|| format!("reading operator document from {}", args.update.display()))?;
    let before = document.clone();
    apply_update(&mut document, &update)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }
    println!("{} Applied {} entries", "✓".green().bold(), update.len());
    println!("{document:#}");
    print_diff(&before, &document, ("before", "after"));
    Ok(())
}

fn print_diff(old: &Value, new: &Value, (old_label, new_label): (&str, &str)) {
    let diff = unified(old, new, old_label, new_label);
    if diff.is_empty() {
        println!("\nNo changes.");
        return;
    }
    println!("\n{}", "Diff".bold());
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }
}

fn print_audit(audit: &ChangeAudit) {
    for change in audit.uncovered() {
        println!("  {} {} has no pending operator", "uncovered:".red().bold(), change.path);
    }
    for entry in &audit.idle {
        println!(
            "  {} {} {} changes nothing",
            "idle:".yellow().bold(),
            entry.kind,
            entry.path
        );
    }
}

// ---- Demo ----

fn cmd_demo(args: DemoArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let dialect = config.dialect_or(args.dialect);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let backend = InMemoryBackend::new();
    let steps = runtime.block_on(run_recipe(&backend, config))?;

    if format == OutputFormat::Json {
        let report: Vec<Value> = steps
            .iter()
            .map(|step| {
                json!({
                    "step": step.label,
                    "value": step.value,
                    "update": step.update.render(dialect),
                    "outcome": format!("{:?}", step.outcome),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for step in &steps {
        println!("{} {}", "==".dimmed(), step.label.bold());
        println!("{:#}", step.value);
        println!("{} {:#}", "update:".bold(), step.update.render(dialect));
        println!("{} {:?}\n", "persist:".bold(), step.outcome);
    }
    println!("{} Done ({} writes)", "✓".green().bold(), backend.writes().len());
    Ok(())
}

struct DemoStep {
    label: &'static str,
    value: Value,
    update: OperatorDocument,
    outcome: PersistOutcome,
}

/// A recipe is created, saved, then edited and saved again.
async fn run_recipe(backend: &InMemoryBackend, config: &CliConfig) -> anyhow::Result<Vec<DemoStep>> {
    let mut recipe = UpdateBuilder::create(
        json!({ "name": "Nachos & Bean", "description": "Yes" }),
        config.builder.clone(),
    )?;
    add_spices(&mut recipe)?;
    add_zest(&mut recipe)?;
    recipe.replace("expensive", true)?;

    let mut steps = Vec::new();
    let (value, update) = (recipe.value(), recipe.query());
    let outcome = recipe.persist(backend).await?;
    steps.push(DemoStep { label: "create", value, update, outcome });

    recipe.append("guests", ["jill", "dave"])?;
    add_zest(&mut recipe)?;
    recipe.set_insert("ingredients", ["salmonella"])?;
    let (value, update) = (recipe.value(), recipe.query());
    let outcome = recipe.persist(backend).await?;
    steps.push(DemoStep { label: "edit", value, update, outcome });

    Ok(steps)
}

fn add_spices(recipe: &mut UpdateBuilder) -> anyhow::Result<()> {
    recipe.append("ingredients", ["chilli"])?;
    recipe.append("drinks", ["water", "milk"])?;
    Ok(())
}

fn add_zest(recipe: &mut UpdateBuilder) -> anyhow::Result<()> {
    recipe.set_insert("guests", ["sam"])?;
    recipe.pull_values("guests", ["jim"])?;
    Ok(())
}
