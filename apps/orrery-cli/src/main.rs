use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use orrery_assets::UvSphere;
use orrery_common::BodyKind;
use orrery_kernel::{ProgramPaths, SceneConfig, SystemState};
use orrery_render_wgpu::{LinkedProgram, VertexLayout};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orrery-cli", about = "Headless tools for the orrery")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene configuration (YAML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print body positions at an instant
    Positions {
        /// Orbital time in seconds
        #[arg(short, long, default_value = "0.0")]
        time: f32,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Generate a UV sphere and print its statistics
    Sphere {
        #[arg(long, default_value = "64")]
        longitude: u32,
        #[arg(long, default_value = "64")]
        latitude: u32,
    },
    /// Compile and link every configured shader program
    CheckShaders,
    /// Print the effective configuration as YAML
    DumpConfig,
}

#[derive(Serialize)]
struct BodyReport {
    body: BodyKind,
    position: Vec3,
    scale: f32,
}

#[derive(Serialize)]
struct PositionsReport {
    time: f32,
    bodies: Vec<BodyReport>,
}

fn positions(config: &SceneConfig, time: f32) -> PositionsReport {
    let state = SystemState::at(&config.orbits, time);
    PositionsReport {
        time,
        bodies: state
            .bodies()
            .into_iter()
            .map(|body| BodyReport {
                body: body.kind,
                position: body.transform.position,
                scale: body.transform.scale,
            })
            .collect(),
    }
}

fn check_program(label: &str, paths: &ProgramPaths) -> anyhow::Result<LinkedProgram> {
    let program = LinkedProgram::from_files(label, paths)?;
    program.check_vertex_layout(&VertexLayout::PositionTexCoord)?;
    Ok(program)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = SceneConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("orrery-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {}", orrery_kernel::crate_info());
            println!("assets: {}", orrery_assets::crate_info());
            println!("input: {}", orrery_input::crate_info());
            println!("render: {}", orrery_render_wgpu::crate_info());
        }
        Commands::Positions { time, json } => {
            let report = positions(&config, time);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("t = {time:.3} s");
                for body in &report.bodies {
                    let p = body.position;
                    println!(
                        "  {:<8} ({:>8.3}, {:>8.3}, {:>8.3})  scale {:.2}",
                        body.body.name(),
                        p.x,
                        p.y,
                        p.z,
                        body.scale
                    );
                }
            }
        }
        Commands::Sphere {
            longitude,
            latitude,
        } => {
            let sphere = UvSphere::generate(longitude, latitude)?;
            let (min, max) = sphere.positions.iter().fold(
                (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                |(min, max), p| {
                    let p = Vec3::from_array(*p);
                    (min.min(p), max.max(p))
                },
            );
            println!("segments: {longitude} x {latitude}");
            println!("vertices: {}", sphere.vertex_count());
            println!("indices:  {} ({} triangles)", sphere.index_count(), sphere.index_count() / 3);
            println!("bounds:   {min:?} .. {max:?}");
        }
        Commands::CheckShaders => {
            let mut failed = 0;
            for (label, paths) in [("sun", &config.shaders.sun), ("planet", &config.shaders.planet)] {
                match check_program(label, paths) {
                    Ok(program) => {
                        let uniforms: Vec<_> = program
                            .uniform_blocks()
                            .iter()
                            .flat_map(|b| b.fields.iter().map(|f| f.name.as_str()))
                            .collect();
                        println!("{label}: ok (uniforms: {})", uniforms.join(", "));
                    }
                    Err(e) => {
                        failed += 1;
                        println!("{label}: FAILED\n{e:#}");
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} shader program(s) failed");
            }
        }
        Commands::DumpConfig => {
            let yaml = config.to_yaml().context("serialize config")?;
            print!("{yaml}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_at_zero() {
        let report = positions(&SceneConfig::default(), 0.0);
        assert_eq!(report.bodies.len(), 4);
        assert_eq!(report.bodies[0].position, Vec3::new(6.0, 0.0, 0.0));
        assert_eq!(report.bodies[1].position, Vec3::new(-6.0, 0.0, 0.0));
        assert_eq!(report.bodies[3].position, Vec3::new(14.0, 0.0, 0.0));
    }

    #[test]
    fn positions_serialize_to_json() {
        let report = positions(&SceneConfig::default(), 1.0);
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["bodies"][2]["body"], "planet");
        assert_eq!(json["bodies"][0]["position"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["orrery-cli", "positions", "--time", "2.5", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Positions { time, json: true } if time == 2.5
        ));
        assert!(Cli::try_parse_from(["orrery-cli", "sphere", "--longitude", "8"]).is_ok());
    }
}
