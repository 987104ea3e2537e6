//! CLI Module
//!
//! Command-line interface for rendering and measuring fade stimuli.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::controller::Condition;

/// Bandfade - gain-transition stimulus generator
#[derive(Parser, Debug)]
#[command(name = "bandfade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render fade stimuli for every configured condition
    #[command(name = "fade")]
    Fade {
        /// Input WAV files, summed over the first file's length
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Directory for the rendered WAV files
        #[arg(short, long)]
        out_dir: PathBuf,

        /// JSON config (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Render only these conditions
        #[arg(long, value_enum)]
        condition: Vec<Condition>,

        /// Scale each output to unit peak before writing
        #[arg(long)]
        normalize: bool,
    },

    /// Print per-channel RMS levels
    #[command(name = "measure")]
    Measure {
        /// WAV file to measure
        path: PathBuf,
    },

    /// Scale a WAV file to a target RMS level
    #[command(name = "set-level")]
    SetLevel {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Target RMS level in dB re full scale
        #[arg(short, long, allow_hyphen_values = true)]
        level_db: f64,

        /// Level both channels to the target instead of keeping the ILD
        #[arg(long)]
        equalize: bool,
    },

    /// Write the default JSON config
    #[command(name = "init-config")]
    InitConfig {
        /// Where to write the config
        path: PathBuf,
    },
}
