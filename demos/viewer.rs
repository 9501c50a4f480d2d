use std::io::{stdout, Write};
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use blockrend::{
    extra::{first_person::FirstPersonController, Ctx},
    obj::{self, ImageTextureSource, LoadOptions},
    scene::{Axis, Command, MeshSel, Trigger},
    transform, Camera, Light, Renderer, Scene, Vector3,
};
use crossterm::{cursor, event, style, terminal, QueueableCommand};

fn main() -> anyhow::Result<()> {
    let folder = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: viewer <model folder>"))?;

    let mut mesh = obj::load_mesh(
        Path::new(&folder),
        &mut ImageTextureSource,
        &LoadOptions { force_smooth: true },
    )?;

    let camera = Camera::new(Vector3::zeros(), 70.0, 2.0);
    let mut scene = Scene::new(camera, 80, 40, Vector3::zeros());

    // Park the model in front of the camera and let it spin.
    let center = mesh.center();
    mesh.transform(&transform::translation(
        -center.x,
        -center.y,
        -center.z - 4.0,
    ));
    scene.add_mesh(mesh);
    scene.add_behavior(
        Trigger::Continuous,
        Command::Rotate {
            target: MeshSel::All,
            axis: Axis::Y,
            degrees: 1.0,
        },
    );
    scene.add_light(Light::new(
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
        1.0,
        50.0,
    ));

    let mut stdout = stdout();
    stdout.queue(cursor::Hide)?;
    stdout.queue(event::EnableMouseCapture)?;
    terminal::enable_raw_mode()?;

    // In case we get an outside sigterm/sigint, we want to gracefully
    // shutdown without leaving the terminal in raw mode.
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, stop.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop.clone())?;

    let mut ctx = Ctx::default();
    let controller = FirstPersonController::default();
    let mut renderer = Renderer::new();
    let mut encoded = String::new();

    let start = Instant::now();
    let mut last_frame = Instant::now();

    while !stop.load(Ordering::SeqCst) && !ctx.should_stop && scene.running {
        let dt = last_frame.elapsed().as_secs_f32();
        last_frame = Instant::now();

        let (cols, rows) = terminal::size()?;
        scene.width = cols as usize;
        scene.height = rows.saturating_sub(1).max(1) as usize;
        // Terminal cells are roughly twice as tall as they are wide.
        scene.camera.aspect = scene.width as f32 / (2.0 * scene.height as f32);

        ctx.new_frame();
        while event::poll(Duration::ZERO)? {
            ctx.event(event::read()?);
        }
        controller.update(&ctx, &mut scene.camera, dt);

        // Slowly sweep the background hue.
        let hue = (start.elapsed().as_secs_f64() * 30.0) % 360.0;
        let rgb = colorsys::Rgb::from(&colorsys::Hsl::new(hue, 60.0, 8.0, None));
        scene.background = Vector3::new(
            rgb.red() as f32 / 255.0,
            rgb.green() as f32 / 255.0,
            rgb.blue() as f32 / 255.0,
        );

        let frame = renderer.update(&mut scene);
        encoded.clear();
        frame.encode_ansi(&mut encoded);
        // Raw mode needs explicit carriage returns.
        stdout.write_all(encoded.replace('\n', "\r\n").as_bytes())?;

        let fps = 1.0 / dt.max(1e-6);
        stdout.queue(style::Print(format!(
            "{:.0} fps | wasd move, arrows/mouse look, i/o speed, esc quit",
            fps
        )))?;
        stdout.flush()?;
    }

    terminal::disable_raw_mode()?;
    stdout.queue(style::ResetColor)?;
    stdout.queue(event::DisableMouseCapture)?;
    stdout.queue(cursor::Show)?;
    stdout.flush()?;

    Ok(())
}
