use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::camera::{Player, advance};
use crate::config::Config;
use crate::grid::Grid;
use crate::input::{KeyOutcome, KeyState};
use crate::present::{StretchMap, stretch_nearest};
use crate::renderer::{Backdrop, PixelBuffer, ProjectionParams, render_frame};
use crate::texture::PixelFormat;
use crate::timing::{FpsCounter, FrameGovernor};

mod camera;
mod caster;
mod config;
mod grid;
mod input;
mod map;
mod present;
mod renderer;
mod texture;
mod timing;

/// Pixel layout of the softbuffer surface.
const SURFACE_FORMAT: PixelFormat = PixelFormat::XRGB8888;

#[derive(Parser)]
#[command(name = "gridcaster", about = "Grid-based first-person raycasting renderer")]
struct Cli {
    /// Map file to load
    map: PathBuf,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window width, overrides the config file
    #[arg(long)]
    width: Option<u32>,

    /// Window height, overrides the config file
    #[arg(long)]
    height: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

type Surface = softbuffer::Surface<Rc<Window>, Rc<Window>>;

struct App {
    config: Config,
    window: Option<Rc<Window>>,
    surface: Option<Surface>,
    grid: Grid,
    player: Player,
    projection: ProjectionParams,

    // Internal render target, stretched onto the window each frame
    frame: PixelBuffer,
    backdrop: Backdrop,
    stretch: StretchMap,

    keys: KeyState,
    governor: FrameGovernor,
    fps: FpsCounter,

    // Set when a handler had to stop the loop on a failure
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config, grid: Grid) -> Self {
        let player = Player::spawn(&grid, config.player.motion(), config.player.focal_length);
        let projection = config.render.projection();
        let backdrop = Backdrop::new(0, &config.render.backdrop_colors(), SURFACE_FORMAT);
        let now = Instant::now();
        Self {
            window: None,
            surface: None,
            grid,
            player,
            projection,
            frame: PixelBuffer::new(0, 0, SURFACE_FORMAT),
            backdrop,
            stretch: StretchMap::default(),
            keys: KeyState::default(),
            governor: FrameGovernor::new(now, config.frame.min_interval(), config.frame.max_delta()),
            fps: FpsCounter::new(now),
            error: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width as f64,
                self.config.window.height as f64,
            ));
        let window = Rc::new(event_loop.create_window(attributes).context("create window")?);

        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| anyhow::anyhow!("softbuffer context: {e}"))?;
        let surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|e| anyhow::anyhow!("softbuffer surface: {e}"))?;

        let size = window.inner_size();
        self.rebuild_internal_frame(size.width as usize, size.height as usize);

        self.surface = Some(surface);
        window.request_redraw();
        self.window = Some(window);
        self.governor.reset(Instant::now());
        Ok(())
    }

    /// Resize the internal target to the window aspect at a fixed height.
    fn rebuild_internal_frame(&mut self, dst_w: usize, dst_h: usize) {
        let target_h = self.config.window.internal_height;
        let aspect = if dst_h > 0 {
            dst_w as f64 / dst_h as f64
        } else {
            1.0
        };

        let mut target_w = ((target_h as f64 * aspect).round() as usize).max(160);
        if target_w % 2 != 0 {
            target_w += 1;
        }

        if target_w != self.frame.width() || target_h != self.frame.height() {
            self.frame = PixelBuffer::new(target_w, target_h, SURFACE_FORMAT);
            self.backdrop =
                Backdrop::new(target_h, &self.config.render.backdrop_colors(), SURFACE_FORMAT);
            tracing::debug!(target_w, target_h, dst_w, dst_h, "internal frame rebuilt");
        }
        self.stretch = StretchMap::new(dst_w, dst_h, target_w, target_h);
    }

    /// Advance the player; `false` when the governor says it is too early.
    fn tick(&mut self) -> bool {
        let Some(dt) = self.governor.poll(Instant::now()) else {
            return false;
        };
        let intent = self.keys.take_intent(self.config.player.focal_step);
        let dt_ms = dt.as_secs_f64() * 1000.0;
        self.player = advance(self.player, &self.grid, dt_ms, intent);
        true
    }

    fn redraw(&mut self, id: WindowId) -> anyhow::Result<()> {
        let (window, surface) = match (&self.window, &mut self.surface) {
            (Some(w), Some(s)) if w.id() == id => (w, s),
            _ => return Ok(()),
        };

        let size = window.inner_size();
        let (Some(dw), Some(dh)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(()); // minimized
        };
        surface
            .resize(dw, dh)
            .map_err(|e| anyhow::anyhow!("resize surface: {e}"))?;

        render_frame(
            &mut self.frame,
            &self.grid,
            &self.player,
            &self.backdrop,
            &self.projection,
        );

        let mut buf = surface
            .buffer_mut()
            .map_err(|e| anyhow::anyhow!("surface buffer: {e}"))?;
        if self.stretch.dst_size() == (dw.get() as usize, dh.get() as usize) {
            stretch_nearest(&mut buf, &self.frame.pixels, self.frame.width(), &self.stretch);
        }
        buf.present()
            .map_err(|e| anyhow::anyhow!("present frame: {e}"))?;

        if let Some(fps) = self.fps.frame(Instant::now()) {
            tracing::debug!(
                fps = format_args!("{fps:.1}"),
                x = self.player.pos.x,
                y = self.player.pos.y,
                rot = self.player.orientation,
                "frame"
            );
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.open_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("close requested");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => {
                    if self.keys.press(code) == KeyOutcome::Quit {
                        tracing::info!("quit requested");
                        event_loop.exit();
                    }
                }
                ElementState::Released => self.keys.release(code),
            },

            WindowEvent::RedrawRequested => {
                if !self.tick() {
                    std::thread::sleep(self.config.frame.idle_sleep());
                } else if let Err(err) = self.redraw(id) {
                    self.fail(event_loop, err);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::Resized(new_size) => {
                self.rebuild_internal_frame(new_size.width as usize, new_size.height as usize);
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = Config::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(w) = cli.width {
        config.window.width = w;
    }
    if let Some(h) = cli.height {
        config.window.height = h;
    }
    config.validate()?;

    // Textures are converted to the surface layout up front, so the map can
    // load before any window exists.
    let grid = Grid::load(&cli.map, SURFACE_FORMAT)
        .with_context(|| format!("loading map {}", cli.map.display()))?
        .with_spawn_orientation(config.player.spawn_orientation);

    let event_loop = EventLoop::new().context("create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, grid);
    event_loop.run_app(&mut app).context("event loop")?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
