mod config;
mod textures;

use anyhow::{Context, Result};
use winit::event::{ElementState, MouseButton, WindowEvent};

use quadra_engine::coords::{Vec2, Viewport};
use quadra_engine::core::{App, AppControl, FrameCtx};
use quadra_engine::device::{Gpu, GpuInit};
use quadra_engine::gfx::{BatchConfig, BatchRenderer, ShaderKind, TextureId, WgpuBackend};
use quadra_engine::logging::{init_logging, LoggingConfig};
use quadra_engine::paint::Color;
use quadra_engine::scene::{BezierPath, Shape};
use quadra_engine::time::FrameTime;
use quadra_engine::window::{Runtime, RuntimeConfig};

use config::DemoConfig;

const STATS_INTERVAL: f32 = 2.0;
const HOVER_TINT: Color = Color::rgb(1.0, 0.85, 0.3);

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = DemoConfig::from_args(std::env::args().skip(1)).context("invalid arguments")?;
    log::info!(
        "{} shapes, {} textures, {} quads per batch",
        config.shapes,
        config.textures,
        config.max_quads
    );

    Runtime::run(
        RuntimeConfig {
            title: "quadra demo".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        DemoApp::new(config),
    )
}

struct DemoApp {
    config: DemoConfig,
    scene: Option<Scene>,
    pressed: bool,
}

impl DemoApp {
    fn new(config: DemoConfig) -> Self {
        Self {
            config,
            scene: None,
            pressed: false,
        }
    }
}

impl App for DemoApp {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if let WindowEvent::MouseInput {
            state,
            button: MouseButton::Left,
            ..
        } = event
        {
            self.pressed = *state == ElementState::Pressed;
        }
        AppControl::Continue
    }

    fn tick(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.scene.is_none() {
            match Scene::new(ctx.gpu, &self.config) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("scene setup failed: {e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Exit;
        };

        scene.update(ctx.time, ctx.pointer, self.pressed, ctx.viewport());
        ctx.render(|view, viewport| {
            scene.draw(view.clone(), viewport);
            Ok(())
        })
    }
}

struct Scene {
    renderer: BatchRenderer<WgpuBackend>,
    grid: Vec<Shape>,
    /// Follows `path`, bouncing between its ends.
    flyer: Shape,
    path: BezierPath,
    /// Creeps toward the top-right corner.
    walker: Shape,
    layout_for: Viewport,
    pointer: Option<Vec2>,
    stats_elapsed: f32,
    stats_frames: u32,
}

impl Scene {
    fn new(gpu: &Gpu<'_>, config: &DemoConfig) -> Result<Self> {
        let mut backend = WgpuBackend::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            gpu.texture_slot_limit(),
        )?;

        let mut textures: Vec<TextureId> = Vec::with_capacity(config.textures + 1);
        for i in 0..config.textures {
            let px = textures::tile(i);
            textures.push(backend.load_texture_rgba8(px.width, px.height, &px.rgba, &format!("tile {i}"))?);
        }
        let image = match config.image.as_deref() {
            Some(path) => {
                let px = textures::load(path)?;
                Some(backend.load_texture_rgba8(px.width, px.height, &px.rgba, &path.display().to_string())?)
            }
            None => None,
        };

        let renderer = BatchRenderer::new(
            backend,
            BatchConfig {
                max_quads: config.max_quads,
                ..BatchConfig::default()
            },
        )?;

        let grid = (0..config.shapes)
            .map(|i| {
                let shape = Shape::new(Vec2::zero(), Vec2::zero());
                // Every fifth shape is a plain colored quad on the blank texture.
                if i % 5 == 4 || textures.is_empty() {
                    shape.with_color(Color::new(0.3, 0.6, 0.9, 0.8))
                } else {
                    shape.with_texture(textures[i % textures.len()])
                }
            })
            .collect();

        let mut flyer = Shape::new(Vec2::new(100.0, 100.0), Vec2::splat(100.0));
        if let Some(image) = image {
            flyer = flyer.with_texture(image);
        }

        Ok(Self {
            renderer,
            grid,
            flyer,
            path: BezierPath::new(
                Vec2::new(100.0, 100.0),
                Vec2::new(150.0, 200.0),
                Vec2::new(300.0, 200.0),
                1.5,
            ),
            walker: Shape::new(Vec2::new(100.0, 100.0), Vec2::splat(100.0))
                .with_color(Color::new(0.9, 0.3, 0.4, 0.9)),
            layout_for: Viewport::default(),
            pointer: None,
            stats_elapsed: 0.0,
            stats_frames: 0,
        })
    }

    fn update(&mut self, time: FrameTime, pointer: Option<Vec2>, pressed: bool, viewport: Viewport) {
        if viewport != self.layout_for {
            self.layout_grid(viewport);
            self.layout_for = viewport;
        }

        if !self.flyer.is_grabbed() {
            let (point, done) = self.path.advance(time.dt);
            self.flyer.position = point;
            if done {
                self.path.reverse();
            }
        }

        if !self.walker.is_grabbed() {
            let corner = Vec2::new(viewport.width, viewport.height) - self.walker.size;
            self.walker.move_towards(corner, 60.0 * time.dt);
        }

        self.pointer = pointer;
        self.drag(pointer, pressed);

        self.stats_elapsed += time.dt;
        self.stats_frames += 1;
        if self.stats_elapsed >= STATS_INTERVAL {
            let s = *self.renderer.stats();
            let frames = self.stats_frames.max(1) as u64;
            log::info!(
                "per frame: {} draws, {} quads, {} texture binds, {} implicit flushes",
                s.draw_calls / frames,
                s.quads / frames,
                s.texture_binds / frames,
                s.implicit_flushes / frames,
            );
            self.renderer.reset_stats();
            self.stats_elapsed = 0.0;
            self.stats_frames = 0;
        }
    }

    /// Grabs the topmost shape under the pointer on press and drags it.
    fn drag(&mut self, pointer: Option<Vec2>, pressed: bool) {
        let mut shapes: Vec<&mut Shape> = self
            .grid
            .iter_mut()
            .chain([&mut self.walker, &mut self.flyer])
            .collect();

        let Some(p) = pointer.filter(|_| pressed) else {
            shapes.iter_mut().for_each(|s| s.set_grabbed(false));
            return;
        };

        match shapes.iter().position(|s| s.is_grabbed()) {
            Some(i) => {
                let size = shapes[i].size;
                shapes[i].position = p - size * 0.5;
            }
            None => {
                if let Some(i) = shapes.iter().rposition(|s| s.contains(p)) {
                    shapes[i].set_grabbed(true);
                }
            }
        }
    }

    fn layout_grid(&mut self, viewport: Viewport) {
        let n = self.grid.len();
        if n == 0 || !viewport.is_valid() {
            return;
        }
        let aspect = viewport.width / viewport.height;
        let cols = ((n as f32 * aspect).sqrt().ceil() as usize).max(1);
        let rows = n.div_ceil(cols);
        let cell = Vec2::new(viewport.width / cols as f32, viewport.height / rows as f32);
        let size = cell * 0.8;

        for (i, shape) in self.grid.iter_mut().enumerate() {
            if shape.is_grabbed() {
                continue;
            }
            let (col, row) = (i % cols, i / cols);
            shape.position = Vec2::new(col as f32 * cell.x, row as f32 * cell.y) + cell * 0.1;
            shape.size = size;
        }
    }

    fn draw(&mut self, view: wgpu::TextureView, viewport: Viewport) {
        let r = &mut self.renderer;
        r.backend_mut().begin_frame(view, viewport);
        r.prepare();

        r.use_shader(ShaderKind::Batch);
        r.begin_batch();
        for shape in self.grid.iter().chain([&self.walker, &self.flyer]) {
            shape.submit(r);
        }
        r.end_batch();
        r.flush();

        // Hover and drag highlight, tinted by the flat-color program.
        let pointer = self.pointer;
        r.use_shader(ShaderKind::FlatColor);
        r.set_tint(HOVER_TINT.with_alpha(0.35));
        r.begin_batch();
        for shape in self.grid.iter().chain([&self.walker, &self.flyer]) {
            if shape.is_grabbed() || pointer.is_some_and(|p| shape.contains(p)) {
                r.draw_quad(shape.position, shape.size, Color::WHITE);
            }
        }
        r.end_batch();
        r.flush();

        r.backend_mut().end_frame();
    }
}
