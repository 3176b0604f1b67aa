//! CLI for importing COLLADA geometry without a renderer
//!
//! Usage:
//!   cargo run --release --bin collada_import -- <file.dae> [options]
//!
//! Options:
//!   --name <name>               Base model name
//!   --config <options.json>     Load import options from JSON
//!   --invert-normals            Negate normals
//!   --normals <auto|always|never>
//!   --no-triangulate            Keep polygons as declared
//!   --format <json|msgpack|binary>
//!   --out <dir>                 Write one file per model
//!   --summary                   Show summary stats only

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use collada_import::mesh::to_msgpack;
use collada_import::{import_file, ImportOptions, ImportReport, MeshBinary, MeshJSON, NormalMode};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Json,
    Msgpack,
    Binary,
}

impl Format {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Format::Json),
            "msgpack" => Some(Format::Msgpack),
            "binary" => Some(Format::Binary),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Msgpack => "msgpack",
            Format::Binary => "bin",
        }
    }
}

struct Args {
    input: String,
    config: Option<String>,
    name: Option<String>,
    invert_normals: bool,
    normals: Option<NormalMode>,
    no_triangulate: bool,
    format: Format,
    out: Option<PathBuf>,
    summary_only: bool,
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <file.dae> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --name <name>                   Base model name (default: model)");
    eprintln!("  --config <options.json>         Load import options from a JSON file");
    eprintln!("  --invert-normals                Negate normals (reversed winding)");
    eprintln!("  --normals <auto|always|never>   When to synthesize normals");
    eprintln!("  --no-triangulate                Keep polygons as declared");
    eprintln!("  --format <json|msgpack|binary>  Output encoding (default: json)");
    eprintln!("  --out <dir>                     Write one file per model into <dir>");
    eprintln!("  --summary                       Show summary stats only");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} cube.dae --summary", program);
    eprintln!("  {} ship.dae --name ship --format binary --out build/", program);
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args {
        input: args[1].clone(),
        config: None,
        name: None,
        invert_normals: false,
        normals: None,
        no_triangulate: false,
        format: Format::Json,
        out: None,
        summary_only: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--name" => {
                i += 1;
                parsed.name = Some(value_at(args, i, "--name")?.to_string());
            }
            "--config" => {
                i += 1;
                parsed.config = Some(value_at(args, i, "--config")?.to_string());
            }
            "--normals" => {
                i += 1;
                let value = value_at(args, i, "--normals")?;
                match NormalMode::parse(value) {
                    Some(mode) => parsed.normals = Some(mode),
                    None => bail!("Unknown normal mode: {}", value),
                }
            }
            "--format" => {
                i += 1;
                let value = value_at(args, i, "--format")?;
                match Format::parse(value) {
                    Some(format) => parsed.format = format,
                    None => bail!("Unknown output format: {}", value),
                }
            }
            "--out" => {
                i += 1;
                parsed.out = Some(PathBuf::from(value_at(args, i, "--out")?));
            }
            "--invert-normals" => parsed.invert_normals = true,
            "--no-triangulate" => parsed.no_triangulate = true,
            "--summary" => parsed.summary_only = true,
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    Ok(parsed)
}

fn value_at<'a>(args: &'a [String], i: usize, flag: &str) -> anyhow::Result<&'a str> {
    match args.get(i) {
        Some(value) => Ok(value),
        None => bail!("{} expects a value", flag),
    }
}

fn build_options(args: &Args) -> anyhow::Result<ImportOptions> {
    let mut options = match &args.config {
        Some(path) => ImportOptions::from_json_file(path)?,
        None => ImportOptions::default(),
    };
    if args.name.is_some() {
        options.model_name = args.name.clone();
    }
    if let Some(mode) = args.normals {
        options.normals = mode;
    }
    if args.invert_normals {
        options.invert_normals = true;
    }
    if args.no_triangulate {
        options.triangulate = false;
    }
    Ok(options)
}

fn print_report(report: &ImportReport, summary_only: bool) {
    for (name, mesh) in &report.models {
        if summary_only {
            println!(
                "{}: vertices={}, triangles={}, submeshes={}",
                name,
                mesh.vertex_count(),
                mesh.triangle_count(),
                mesh.submeshes.len()
            );
            continue;
        }

        println!("=== Model: {} ===", name);
        println!("  Vertices: {}", mesh.vertex_count());
        println!("  Indices: {}", mesh.indices.len());
        if let Some(bounds) = mesh.bounds() {
            println!("  Bounds: {:?} - {:?}", bounds.min, bounds.max);
        }
        for (idx, submesh) in mesh.submeshes.iter().enumerate() {
            println!(
                "    Submesh[{}]: material={:?}, first_index={}, index_count={}",
                idx, submesh.material, submesh.first_index, submesh.index_count
            );
        }
        for diagnostic in report.diagnostics_for(name) {
            println!("  warning: {}", diagnostic);
        }
        println!();
    }

    for failure in &report.failures {
        println!(
            "FAILED {} (geometry {}): {}",
            failure.name,
            failure.geometry_id.as_deref().unwrap_or("?"),
            failure.error
        );
    }

    println!();
    println!("=== Summary ===");
    println!("  Models: {}", report.models.len());
    println!("  Failed: {}", report.failures.len());
    println!(
        "  Total triangles: {}",
        report.models.values().map(|m| m.triangle_count()).sum::<usize>()
    );
}

fn write_models(report: &ImportReport, format: Format, out: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    for (name, mesh) in &report.models {
        let bytes = match format {
            Format::Json => MeshJSON::from_mesh(name, mesh).to_json()?.into_bytes(),
            Format::Msgpack => to_msgpack(mesh)?,
            Format::Binary => MeshBinary::new(name, mesh).to_bytes(),
        };
        let path = out.join(format!("{}.{}", name, format.extension()));
        fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Wrote {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let options = build_options(args)?;

    eprintln!("Loading: {}", args.input);
    let start = std::time::Instant::now();
    let report = import_file(&args.input, &options)?;
    eprintln!("Imported in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
    eprintln!();

    print_report(&report, args.summary_only);

    if let Some(out) = &args.out {
        write_models(&report, args.format, out)?;
    }

    // a document whose geometries all failed is an error; partial success is not
    Ok(report.failures.is_empty() || !report.models.is_empty())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("collada_import");
    if args.len() < 2 {
        print_usage(program);
        return ExitCode::from(2);
    }

    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            print_usage(program);
            return ExitCode::from(2);
        }
    };

    match run(&parsed) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
