//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - runs the scrub pipeline, re-plots exports, or writes synthetic data
//! - prints reports/plots

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, PlotArgs, RunArgs, SynthArgs};
use crate::domain::{RunConfig, ScrubConfig, SynthConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `tsvar` binary.
pub fn run() -> Result<(), AppError> {
    // Environment defaults must be in place before clap reads `env = ...` args.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init_tracing(&cli.log_level)?;

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Plot(args) => handle_plot(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_scrub(&config)?;

    println!("{}", crate::report::format_run_summary(&config, &run.outcome));

    if config.plot {
        if let Some(last) = &run.last_iteration {
            println!(
                "{}",
                crate::plot::render_variance_trace(
                    &format!("Volume variance (iteration {})", last.iteration),
                    last.variance.volume.view(),
                    config.scrub.threshold,
                    config.plot_width,
                    config.plot_height,
                )
            );
        }
        println!(
            "{}",
            crate::plot::render_slice_regressor(run.outcome.slice_regressor.view(), config.plot_width)
        );
    }

    for path in &run.written {
        info!(path = %path.display(), "wrote output");
    }

    match run.outcome.error() {
        Some(err) => Err(err.clone().into()),
        None => Ok(()),
    }
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let exported = crate::io::load_exported_run(&args.input)?;

    for (i, volume) in exported.volume_variance.iter().enumerate() {
        println!(
            "{}",
            crate::plot::render_variance_trace(
                &format!("Volume variance (iteration {})", i + 1),
                volume.view(),
                args.threshold,
                args.width,
                args.height,
            )
        );
    }
    if let Some(reg) = &exported.volume_regressor {
        println!("{}", crate::plot::render_volume_regressor(reg.view(), args.width));
    }
    if let Some(reg) = &exported.slice_regressor {
        println!("{}", crate::plot::render_slice_regressor(reg.view(), args.width));
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = synth_config_from_args(&args);
    let synth = crate::data::generate_signal(&config)?;
    crate::io::write_volume(&args.output, synth.signal.view(), None)?;
    print!("{}", crate::report::format_synth_summary(&args.output, &config, &synth));
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        data_path: args.data.clone(),
        output: args.output.clone(),
        scrub: ScrubConfig {
            slice_axis: args.slice_axis,
            threshold: args.threshold,
            mode: args.scrub,
            max_iterations: args.max_iterations,
        },
        save_var: args.save_var,
        save_reg: args.save_reg,
        save_varimg: args.save_varimg,
        save_summary: args.save_summary,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
    }
}

pub fn synth_config_from_args(args: &SynthArgs) -> SynthConfig {
    SynthConfig {
        shape: args.shape,
        seed: args.seed,
        baseline: args.baseline,
        noise_sd: args.noise,
        spike_prob: args.spike_prob,
        spike_scale: args.spike_scale,
        slice_spike_prob: args.slice_spike_prob,
        slice_axis: args.slice_axis,
    }
}
