use std::{
    collections::VecDeque,
    fmt::Display,
    path::PathBuf,
    str::FromStr,
    time::{Duration, Instant},
};

use clap::{value_parser, Arg, ArgAction, Command};
use log::LevelFilter;

pub mod core;
pub mod gpu;
pub mod import;
pub mod util;

pub use core::{Camera, CameraConfig, CameraMovement, LoadError, Mesh, MeshData, Model, MouseLook};
pub use gpu::{GpuContext, GraphicsApi};
pub use import::{ObjImporter, SceneImporter};
pub use util::format_mat4;

/// Frame timings over a rolling window.
pub struct Metrics {
    last_frame: Instant,
    frame_times: VecDeque<f32>,
    window: usize,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(120)
    }
}

impl Metrics {
    pub fn new(window: usize) -> Self {
        Self {
            last_frame: Instant::now(),
            frame_times: VecDeque::with_capacity(window),
            window: window.max(1),
        }
    }

    /// Marks the end of a frame and returns its duration.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.update(delta);
        delta
    }

    pub fn update(&mut self, frame_delta: Duration) {
        if self.frame_times.len() == self.window {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_delta.as_secs_f32() * 1000.0);
    }

    pub fn average_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    pub fn fps(&self) -> f32 {
        let avg = self.average_ms();
        if avg > 0.0 {
            1000.0 / avg
        } else {
            0.0
        }
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FPS: {:.1} | Avg: {:.2}ms | Min: {:.2}ms | Max: {:.2}ms",
            self.fps(),
            self.average_ms(),
            self.frame_times.iter().copied().reduce(f32::min).unwrap_or(0.0),
            self.frame_times.iter().copied().reduce(f32::max).unwrap_or(0.0)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub model: PathBuf,
    pub width: usize,
    pub height: usize,
    pub gamma_correction: bool,
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    View(ViewerConfig),
    Inspect { model: PathBuf },
}

fn model_arg() -> Arg {
    Arg::new("model")
        .short('f')
        .long("model")
        .value_name("FILE")
        .help("Path to the model file (.obj, materials are read from its .mtl)")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

pub fn create_clap_command() -> Command {
    Command::new("model_viewer")
        .about("Load a textured model and fly around it")
        .version("0.1")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Terminal log level")
                .global(true)
                .value_parser(["off", "error", "warn", "info", "debug", "trace"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Also write the log to this file")
                .global(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("view")
                .about("Open a window and render the model")
                .arg(model_arg())
                .arg(
                    Arg::new("gamma")
                        .long("gamma")
                        .help("Mark the model as gamma corrected")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("width")
                        .long("width")
                        .value_parser(value_parser!(usize))
                        .default_value("1280"),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .value_parser(value_parser!(usize))
                        .default_value("720"),
                )
                .arg(
                    Arg::new("speed")
                        .long("speed")
                        .help("Camera speed in units per second [default: 3]")
                        .value_parser(value_parser!(f32)),
                )
                .arg(
                    Arg::new("sensitivity")
                        .long("sensitivity")
                        .help("Degrees per pixel of mouse movement [default: 0.25]")
                        .value_parser(value_parser!(f32)),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Load the model headless and print what was uploaded")
                .arg(model_arg()),
        )
}

pub fn handle_log_matches(matches: &clap::ArgMatches) -> LogConfig {
    let level = matches
        .get_one::<String>("log-level")
        .and_then(|s| LevelFilter::from_str(s).ok())
        .unwrap_or(LevelFilter::Info);
    LogConfig {
        level,
        file: matches.get_one::<PathBuf>("log-file").cloned(),
    }
}

pub fn handle_clap_matches(matches: &clap::ArgMatches) -> Option<AppCommand> {
    match matches.subcommand() {
        Some(("view", sub)) => {
            let mut camera = CameraConfig::default();
            if let Some(&speed) = sub.get_one::<f32>("speed") {
                camera.movement_speed = speed;
            }
            if let Some(&sensitivity) = sub.get_one::<f32>("sensitivity") {
                camera.mouse_sensitivity = sensitivity;
            }
            Some(AppCommand::View(ViewerConfig {
                model: sub.get_one::<PathBuf>("model")?.clone(),
                width: sub.get_one::<usize>("width").copied().unwrap_or(1280),
                height: sub.get_one::<usize>("height").copied().unwrap_or(720),
                gamma_correction: sub.get_flag("gamma"),
                camera,
            }))
        }
        Some(("inspect", sub)) => Some(AppCommand::Inspect {
            model: sub.get_one::<PathBuf>("model")?.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> clap::ArgMatches {
        create_clap_command().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn view_uses_camera_defaults() {
        let matches = parse(&["model_viewer", "view", "--model", "assets/backpack.obj"]);
        let Some(AppCommand::View(config)) = handle_clap_matches(&matches) else {
            panic!("expected view");
        };
        assert_eq!(config.model, PathBuf::from("assets/backpack.obj"));
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(!config.gamma_correction);
        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(handle_log_matches(&matches).level, LevelFilter::Info);
    }

    #[test]
    fn view_overrides() {
        let matches = parse(&[
            "model_viewer",
            "--log-level",
            "debug",
            "view",
            "-f",
            "m.obj",
            "--gamma",
            "--speed",
            "7.5",
            "--width",
            "640",
            "--log-file",
            "viewer.log",
        ]);
        let Some(AppCommand::View(config)) = handle_clap_matches(&matches) else {
            panic!("expected view");
        };
        assert!(config.gamma_correction);
        assert_eq!(config.camera.movement_speed, 7.5);
        assert_eq!(config.width, 640);
        let log = handle_log_matches(&matches);
        assert_eq!(log.level, LevelFilter::Debug);
        assert_eq!(log.file, Some(PathBuf::from("viewer.log")));
    }

    #[test]
    fn inspect_requires_model() {
        assert!(create_clap_command()
            .try_get_matches_from(["model_viewer", "inspect"])
            .is_err());
        let matches = parse(&["model_viewer", "inspect", "--model", "a.obj"]);
        assert_eq!(
            handle_clap_matches(&matches),
            Some(AppCommand::Inspect {
                model: PathBuf::from("a.obj")
            })
        );
    }

    #[test]
    fn metrics_average_over_window() {
        let mut metrics = Metrics::new(2);
        metrics.update(Duration::from_millis(10));
        metrics.update(Duration::from_millis(30));
        metrics.update(Duration::from_millis(10));
        assert!((metrics.average_ms() - 20.0).abs() < 1e-3);
        assert!((metrics.fps() - 50.0).abs() < 1e-2);
        assert_eq!(Metrics::new(4).fps(), 0.0);
    }
}
