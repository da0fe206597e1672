use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use glam::{Mat4, Vec2};
use log::{info, LevelFilter};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Scale, Window, WindowOptions};
use model_viewer::{
    core::{camera::DEFAULT_POSITION, texture::sampler_bindings},
    create_clap_command,
    gpu::{software::SoftwareStats, SoftwareBackend},
    handle_clap_matches, handle_log_matches,
    util::format_vec3,
    AppCommand, Camera, CameraMovement, GpuContext, GraphicsApi, LogConfig, Metrics, Model,
    MouseLook, ObjImporter, ViewerConfig,
};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

fn main() -> Result<()> {
    let matches = create_clap_command().get_matches();
    init_logging(&handle_log_matches(&matches))?;

    match handle_clap_matches(&matches) {
        Some(AppCommand::View(config)) => run_window(&config),
        Some(AppCommand::Inspect { model }) => inspect(&model),
        None => {
            create_clap_command().print_help()?;
            Ok(())
        }
    }
}

fn init_logging(config: &LogConfig) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        config.level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = &config.file {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file '{}'", path.display()))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }
    CombinedLogger::init(loggers).context("logger already initialised")?;
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let mut ctx = GpuContext::new(SoftwareBackend::new(1, 1));
    let model = Model::load(&mut ctx, &ObjImporter, path, false)
        .with_context(|| format!("failed to load '{}'", path.display()))?;

    println!("{}", path.display());
    println!("  directory: {}", model.directory().display());
    for (i, mesh) in model.meshes().iter().enumerate() {
        println!(
            "  mesh {}: {} vertices, {} triangles",
            i,
            mesh.vertex_count(),
            mesh.index_count() / 3
        );
        for binding in sampler_bindings(mesh.textures()) {
            println!(
                "    unit {} {} <- {}",
                binding.unit,
                binding.uniform,
                binding.texture.path.display()
            );
        }
    }
    println!("  textures: {}", model.texture_count());

    model.release(&mut ctx);
    let SoftwareStats {
        buffers,
        textures,
        uploaded_bytes,
        ..
    } = ctx.api_ref().stats();
    println!(
        "  uploaded {} buffers, {} textures, {} bytes",
        buffers, textures, uploaded_bytes
    );
    Ok(())
}

fn run_window(config: &ViewerConfig) -> Result<()> {
    let mut window = Window::new(
        "Model Viewer",
        config.width,
        config.height,
        WindowOptions {
            resize: true,
            scale: Scale::X1,
            ..WindowOptions::default()
        },
    )
    .context("unable to open window")?;

    let mut ctx = GpuContext::new(SoftwareBackend::new(config.width, config.height));
    let model = Model::load(&mut ctx, &ObjImporter, &config.model, config.gamma_correction)
        .with_context(|| format!("failed to load '{}'", config.model.display()))?;
    let program = ctx.api().create_program();

    let mut camera = Camera::new(DEFAULT_POSITION, config.camera);
    let mut mouse = MouseLook::new();
    let mut metrics = Metrics::default();

    info!("WASD to move, drag with the left button to look, scroll to zoom, Esc to quit");

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let dt = metrics.tick().as_secs_f32();
        handle_input(&window, &mut camera, &mut mouse, dt);
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            camera = Camera::new(DEFAULT_POSITION, config.camera);
        }

        let (width, height) = window.get_size();
        let (width, height) = (width.max(1), height.max(1));
        let api = ctx.api();
        api.resize(width, height);
        api.clear();
        api.use_program(Some(program));
        api.set_uniform_mat4(program, "model", &Mat4::IDENTITY);
        api.set_uniform_mat4(program, "view", &camera.view_matrix());
        api.set_uniform_mat4(
            program,
            "projection",
            &camera.projection_matrix(width as f32 / height as f32, NEAR, FAR),
        );
        model.draw(&mut ctx, program);

        let framebuffer = ctx.api_ref().framebuffer();
        window
            .update_with_buffer(&framebuffer.data, framebuffer.width, framebuffer.height)
            .context("failed to present frame")?;
        window.set_title(&format!(
            "Model Viewer | {} | pos {} | fov {:.0}",
            metrics,
            format_vec3(camera.position()),
            camera.zoom()
        ));
    }

    model.release(&mut ctx);
    Ok(())
}

fn handle_input(window: &Window, camera: &mut Camera, mouse: &mut MouseLook, dt: f32) {
    let bindings = [
        (Key::W, CameraMovement::Forward),
        (Key::S, CameraMovement::Backward),
        (Key::A, CameraMovement::Left),
        (Key::D, CameraMovement::Right),
    ];
    for (key, direction) in bindings {
        if window.is_key_down(key) {
            camera.move_discrete(direction, dt);
        }
    }

    if window.get_mouse_down(MouseButton::Left) {
        if let Some((x, y)) = window.get_mouse_pos(MouseMode::Pass) {
            let delta = mouse.delta(Vec2::new(x, y));
            camera.look(delta.x, delta.y, true);
        }
    } else {
        mouse.reset();
    }

    if let Some((_, scroll)) = window.get_scroll_wheel() {
        camera.zoom_by(scroll);
    }
}
