use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "compgraph", version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dry-run the requested nodes over a frame range.
    Validate(RequestArgs),
    /// Validate, then evaluate the requested nodes over a frame range.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Scene JSON describing nodes and connections.
    #[arg(long)]
    scene: PathBuf,

    /// First frame (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    start: i64,

    /// Last frame (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    end: i64,

    /// Terminal nodes to evaluate.
    #[arg(required = true)]
    nodes: Vec<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_scene(path: &Path) -> anyhow::Result<compgraph::MemoryGraph> {
    let f = File::open(path).with_context(|| format!("open scene '{}'", path.display()))?;
    let doc: compgraph::SceneDoc = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse scene JSON '{}'", path.display()))?;
    doc.build()
        .with_context(|| format!("build graph from '{}'", path.display()))
}

fn make_engine(scene: &Path) -> compgraph::ProbeEngine {
    let root = scene.parent().unwrap_or_else(|| Path::new("."));
    compgraph::ProbeEngine::new().with_base_dir(root)
}

fn request(args: &RequestArgs) -> compgraph::ExecutionRequest {
    compgraph::ExecutionRequest::new(args.nodes.iter().map(String::as_str), args.start, args.end)
}

fn cmd_validate(args: RequestArgs) -> anyhow::Result<()> {
    let graph = read_scene(&args.scene)?;
    let mut ctl = compgraph::ExecutionController::new(&graph, make_engine(&args.scene));
    let req = request(&args);

    ctl.validate(&req)
        .with_context(|| format!("validate {:?} over [{}, {}]", args.nodes, args.start, args.end))?;

    println!(
        "ok: {} node(s) valid over [{}, {}]",
        req.node_ids.len(),
        args.start,
        args.end
    );
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let RunArgs { request: r, json } = args;
    let graph = read_scene(&r.scene)?;
    let mut ctl = compgraph::ExecutionController::new(&graph, make_engine(&r.scene));

    let report = ctl
        .run(&request(&r))
        .with_context(|| format!("run {:?} over [{}, {}]", r.nodes, r.start, r.end))?;

    if json {
        let s = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{s}");
        return Ok(());
    }

    println!(
        "ran {} frame(s) [{}, {}] over {} node(s), {} engine call(s)",
        report.frames_evaluated,
        report.first_frame,
        report.last_frame,
        report.node_count,
        report.engine_calls
    );
    let engine = ctl.engine();
    for w in engine.committed_writes() {
        println!("  write {} frame {} -> {}", w.node_id, w.frame, w.path.display());
    }
    if engine.viewport().updates() > 0 {
        println!("  viewport updates: {}", engine.viewport().updates());
    }
    Ok(())
}
