use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use resume_core::{project_dirs, Command, LoadState, Viewer, ViewerConfig, ViewerEvent};
use resume_render::PdfRenderFactory;
use resume_tty::{
    bottom_bar, centered, compose_viewport, failure_lines, top_bar, write_status_line, DrawParams,
    EventMapper, KittyRenderer, PlacedPage, ToolbarState, UiEvent, LOADING_MESSAGE,
};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

mod platform;

use platform::SystemActions;

#[derive(Debug, Parser)]
#[command(
    name = "resume-viewer",
    version,
    about = "kitty-native resume viewer with scroll-synced page tracking"
)]
struct Args {
    /// PDF to show (defaults to the configured document, resume.pdf)
    file: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// URL opened by the website control
    #[arg(long)]
    website: Option<String>,

    /// Path to the pdfium shared library
    #[arg(long = "pdfium-library")]
    pdfium_library: Option<PathBuf>,

    /// Page to scroll to once the document is shown (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,
}

impl Args {
    fn apply_to(&self, config: &mut ViewerConfig) {
        if let Some(file) = &self.file {
            config.document = file.clone();
        }
        if let Some(website) = &self.website {
            config.website = website.clone();
        }
        if let Some(library) = &self.pdfium_library {
            config.renderer.library_path = Some(library.clone());
        }
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(
            stdout,
            DisableMouseCapture,
            LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Terminal geometry in cells and the pixel size of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Screen {
    columns: u16,
    rows: u16,
    cell_width: f32,
    cell_height: f32,
}

impl Screen {
    // Used when the terminal does not report its pixel size.
    const FALLBACK_CELL: (f32, f32) = (10.0, 20.0);

    fn measure() -> Result<Self> {
        match terminal::window_size() {
            Ok(size) => Ok(Self::from_dimensions(
                size.columns,
                size.rows,
                size.width,
                size.height,
            )),
            Err(err) => {
                debug!(?err, "terminal did not report pixel size");
                let (columns, rows) = terminal::size()?;
                Ok(Self::from_dimensions(columns, rows, 0, 0))
            }
        }
    }

    fn from_dimensions(columns: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let (cell_width, cell_height) = if pixel_width > 0 && pixel_height > 0 {
            (
                f32::from(pixel_width) / f32::from(columns),
                f32::from(pixel_height) / f32::from(rows),
            )
        } else {
            Self::FALLBACK_CELL
        };
        Self {
            columns,
            rows,
            cell_width,
            cell_height,
        }
    }

    /// Rows between the top and bottom bars.
    fn viewport_rows(&self) -> u16 {
        self.rows.saturating_sub(2).max(1)
    }

    fn bottom_row(&self) -> u16 {
        self.rows.saturating_sub(1)
    }

    fn window_width(&self) -> f32 {
        f32::from(self.columns) * self.cell_width
    }

    fn viewport_height(&self) -> f32 {
        f32::from(self.viewport_rows()) * self.cell_height
    }

    fn fit(&self, viewer: &mut Viewer, mapper: &mut EventMapper) {
        viewer.resize(self.window_width(), self.viewport_height());
        mapper.set_page_step(self.viewport_height() * 0.9);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = init_logging()?;

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::load_or_default()?,
    };
    args.apply_to(&mut config);
    config.validate()?;

    let provider =
        PdfRenderFactory::new(&config.renderer).context("failed to initialise the pdf renderer")?;
    let actions = Arc::new(SystemActions::new(
        config.print_command.clone(),
        config.print_args.clone(),
    ));
    let mut viewer = Viewer::new(config, actions)?;
    let frame_interval = viewer.config().frame_interval;

    let _raw = RawModeGuard::new()?;
    let mut renderer = KittyRenderer::new(io::stdout());
    let mut mapper = EventMapper::new(viewer.config().scroll_step);
    let mut screen = Screen::measure()?;
    screen.fit(&mut viewer, &mut mapper);

    redraw(&mut renderer, &viewer, &screen, &mapper, None)?;
    viewer.load(&provider).await;
    if let Some(page) = args.page {
        viewer.apply(Command::GotoPage { page })?;
    }

    let mut notice: Option<String> = None;
    let mut dirty = true;

    loop {
        for event in viewer.drain_events() {
            match event {
                ViewerEvent::Notice(text) => {
                    info!(%text, "notice");
                    notice = Some(text);
                }
                ViewerEvent::PageChanged { page } => debug!(page, "current page changed"),
                ViewerEvent::ScaleChanged { scale } => debug!(scale, "zoom changed"),
                ViewerEvent::Loaded { .. }
                | ViewerEvent::LoadFailed { .. }
                | ViewerEvent::RedrawNeeded => {}
            }
            dirty = true;
        }

        if dirty {
            redraw(&mut renderer, &viewer, &screen, &mapper, notice.as_deref())?;
            dirty = false;
        }

        let timeout = if viewer.is_animating() {
            frame_interval
        } else {
            Duration::from_millis(100)
        };
        if event::poll(timeout)? {
            match mapper.map_event(event::read()?) {
                UiEvent::Command(command) => {
                    notice = None;
                    viewer.apply(command)?;
                    dirty = true;
                }
                UiEvent::PageInputChanged => dirty = true,
                UiEvent::Resize => {
                    screen = Screen::measure()?;
                    screen.fit(&mut viewer, &mut mapper);
                    renderer.clear_all()?;
                }
                UiEvent::Quit => break,
                UiEvent::None => {}
            }
        }

        if viewer.tick() {
            dirty = true;
        }
    }

    renderer.delete_images()?;
    renderer.clear_all()?;
    Ok(())
}

fn redraw(
    renderer: &mut KittyRenderer<Stdout>,
    viewer: &Viewer,
    screen: &Screen,
    mapper: &EventMapper,
    notice: Option<&str>,
) -> Result<()> {
    let width = usize::from(screen.columns);
    renderer.begin_sync_update()?;

    match viewer.state() {
        LoadState::Loading => {
            renderer.delete_images()?;
            renderer.clear_all()?;
            draw_line(renderer, screen.rows / 2, &centered(LOADING_MESSAGE, width))?;
        }
        LoadState::Failed { .. } => {
            renderer.delete_images()?;
            renderer.clear_all()?;
            let middle = screen.rows / 2;
            for (offset, line) in (0u16..).zip(failure_lines()) {
                draw_line(
                    renderer,
                    middle.saturating_sub(1) + offset,
                    &centered(line, width),
                )?;
            }
        }
        LoadState::Loaded { .. } if !viewer.controls_visible() => {
            renderer.delete_images()?;
            renderer.clear_all()?;
        }
        LoadState::Loaded { page_count } => {
            let breakpoint = viewer.breakpoint();
            draw_line(
                renderer,
                0,
                &format!("{:>width$}", top_bar(breakpoint), width = width),
            )?;

            draw_pages(renderer, viewer, screen)?;

            let toolbar = ToolbarState {
                current_page: viewer.current_page(),
                page_count: *page_count,
                zoom_percent: viewer.tracker().view().zoom_percent(),
                page_input: mapper.pending_input(),
                notice,
                breakpoint,
            };
            draw_line(
                renderer,
                screen.bottom_row(),
                &centered(&bottom_bar(&toolbar), width),
            )?;
        }
    }

    renderer.end_sync_update()?;
    Ok(())
}

fn draw_pages(
    renderer: &mut KittyRenderer<Stdout>,
    viewer: &Viewer,
    screen: &Screen,
) -> Result<()> {
    let rendered: Vec<_> = viewer
        .visible_pages()
        .into_iter()
        .filter_map(|visible| match viewer.render_page(visible.page) {
            Ok(image) => Some((visible.rect, image)),
            Err(err) => {
                warn!(?err, page = visible.page, "failed to render page");
                None
            }
        })
        .collect();
    let placed: Vec<PlacedPage<'_>> = rendered
        .iter()
        .map(|(rect, image)| PlacedPage {
            rect: *rect,
            image: image.as_ref(),
        })
        .collect();

    let canvas = compose_viewport(
        screen.window_width().round() as u32,
        screen.viewport_height().round() as u32,
        viewer.scroll_top(),
        &placed,
    );

    {
        let mut writer = renderer.writer();
        crossterm::execute!(&mut writer, cursor::MoveTo(0, 1))?;
    }
    renderer.draw(
        &canvas,
        DrawParams::clamped(
            u32::from(screen.columns),
            u32::from(screen.viewport_rows()),
        ),
    )
}

fn draw_line(renderer: &mut KittyRenderer<Stdout>, row: u16, text: &str) -> Result<()> {
    let mut writer = renderer.writer();
    crossterm::execute!(
        &mut writer,
        cursor::MoveTo(0, row),
        Clear(ClearType::CurrentLine)
    )?;
    write_status_line(&mut writer, text)?;
    Ok(())
}

fn init_logging() -> Result<WorkerGuard> {
    let project_dirs =
        project_dirs().ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "resume-viewer.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Only the file layer: stdout carries the kitty graphics stream.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_uses_reported_cell_size() {
        let screen = Screen::from_dimensions(100, 40, 1000, 800);
        assert_eq!(screen.cell_width, 10.0);
        assert_eq!(screen.cell_height, 20.0);
        assert_eq!(screen.viewport_rows(), 38);
        assert_eq!(screen.bottom_row(), 39);
        assert_eq!(screen.window_width(), 1000.0);
        assert_eq!(screen.viewport_height(), 760.0);
    }

    #[test]
    fn screen_falls_back_without_pixel_size() {
        let screen = Screen::from_dimensions(80, 24, 0, 0);
        assert_eq!(
            (screen.cell_width, screen.cell_height),
            Screen::FALLBACK_CELL
        );
        assert_eq!(screen.window_width(), 800.0);
    }

    #[test]
    fn tiny_screen_keeps_one_viewport_row() {
        let screen = Screen::from_dimensions(0, 1, 0, 0);
        assert_eq!(screen.columns, 1);
        assert_eq!(screen.viewport_rows(), 1);
        assert_eq!(screen.bottom_row(), 0);
    }

    #[test]
    fn arguments_override_config() {
        let args = Args::parse_from([
            "resume-viewer",
            "cv.pdf",
            "--website",
            "https://example.com",
            "--pdfium-library",
            "/opt/pdfium/libpdfium.so",
            "--page",
            "2",
        ]);
        let mut config = ViewerConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.document, PathBuf::from("cv.pdf"));
        assert_eq!(config.website, "https://example.com");
        assert_eq!(
            config.renderer.library_path,
            Some(PathBuf::from("/opt/pdfium/libpdfium.so"))
        );
        assert_eq!(args.page, Some(2));
    }

    #[test]
    fn missing_arguments_keep_config() {
        let args = Args::parse_from(["resume-viewer"]);
        let mut config = ViewerConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config, ViewerConfig::default());
    }
}
