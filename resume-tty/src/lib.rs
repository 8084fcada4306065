use std::io::{self, Write};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind},
    terminal::{Clear, ClearType},
};
use png::{BitDepth, ColorType, Encoder};
use resume_core::{Command, RenderImage};
use tracing::trace;

pub mod canvas;
pub mod toolbar;

pub use canvas::{compose_viewport, PlacedPage};
pub use toolbar::{bottom_bar, centered, failure_lines, top_bar, ToolbarState, LOADING_MESSAGE};

pub struct KittyRenderer<W: Write> {
    writer: W,
    image_id: u32,
    placement_id: u32,
}

pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            image_id: 1,
            placement_id: 1,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Transmits `image` as PNG and places it at the cursor, replacing the
    /// previous frame (same image and placement id).
    pub fn draw(&mut self, image: &RenderImage, params: DrawParams) -> Result<()> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
        writer.finish()?;

        let encoded = BASE64.encode(&buffer);
        let mut chunks = encoded.as_bytes().chunks(4096).peekable();
        let mut first = true;

        while let Some(chunk) = chunks.next() {
            let more = u8::from(chunks.peek().is_some());
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={},p={},c={},r={},z=-1,m={}",
                    self.image_id, self.placement_id, params.columns, params.rows, more
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={},q=2", more)?;
            }
            if !chunk.is_empty() {
                self.writer.write_all(b";")?;
                self.writer.write_all(chunk)?;
            }
            write!(self.writer, "\u{1b}\\")?;
        }

        self.writer.flush()?;
        trace!(width = image.width, height = image.height, "frame sent");
        Ok(())
    }

    /// Removes every image this renderer placed.
    pub fn delete_images(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}_Ga=d,d=A,q=2\u{1b}\\")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// The terminal renders everything buffered since `begin_sync_update`.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    PageInputChanged,
    Resize,
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    PageInput,
}

/// Translates terminal input into viewer commands.
///
/// Digits open the page field; `Enter` submits it and `Esc` discards it.
#[derive(Debug)]
pub struct EventMapper {
    mode: InputMode,
    page_buffer: String,
    scroll_step: f32,
    page_step: f32,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SCROLL_STEP)
    }
}

impl EventMapper {
    pub const DEFAULT_SCROLL_STEP: f32 = 48.0;
    const MAX_PAGE_DIGITS: usize = 4;

    pub fn new(scroll_step: f32) -> Self {
        Self {
            mode: InputMode::Normal,
            page_buffer: String::new(),
            scroll_step,
            page_step: scroll_step * 10.0,
        }
    }

    /// Distance moved by PageUp/PageDown/Space; follows the viewport height.
    pub fn set_page_step(&mut self, page_step: f32) {
        self.page_step = page_step.max(self.scroll_step);
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn pending_input(&self) -> Option<&str> {
        match self.mode {
            InputMode::PageInput => Some(self.page_buffer.as_str()),
            InputMode::Normal => None,
        }
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Release => UiEvent::None,
            Event::Key(key) => match self.mode {
                InputMode::Normal => self.map_key_normal(key),
                InputMode::PageInput => self.map_key_page_input(key),
            },
            Event::Mouse(mouse) => self.map_mouse(mouse),
            Event::Resize(..) => UiEvent::Resize,
            _ => UiEvent::None,
        }
    }

    fn map_key_normal(&mut self, key: KeyEvent) -> UiEvent {
        let KeyEvent {
            code, modifiers, ..
        } = key;
        match (code, modifiers) {
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => UiEvent::Quit,
            (KeyCode::Char(c), m) if c.is_ascii_digit() && !m.contains(KeyModifiers::CONTROL) => {
                self.mode = InputMode::PageInput;
                self.page_buffer.clear();
                self.page_buffer.push(c);
                UiEvent::PageInputChanged
            }
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
                self.scroll(self.scroll_step)
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
                self.scroll(-self.scroll_step)
            }
            (KeyCode::Char(' '), KeyModifiers::NONE) | (KeyCode::PageDown, _) => {
                self.scroll(self.page_step)
            }
            (KeyCode::Char(' '), KeyModifiers::SHIFT) | (KeyCode::PageUp, _) => {
                self.scroll(-self.page_step)
            }
            (KeyCode::Char('n'), KeyModifiers::NONE) | (KeyCode::Right, _) => {
                UiEvent::Command(Command::NextPage)
            }
            (KeyCode::Char('p'), KeyModifiers::NONE)
            | (KeyCode::Char('N'), _)
            | (KeyCode::Left, _) => UiEvent::Command(Command::PreviousPage),
            (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
                UiEvent::Command(Command::FirstPage)
            }
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => UiEvent::Command(Command::LastPage),
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => {
                UiEvent::Command(Command::ZoomIn)
            }
            (KeyCode::Char('-'), _) => UiEvent::Command(Command::ZoomOut),
            (KeyCode::Char('P'), _) => UiEvent::Command(Command::Print),
            (KeyCode::Char('D'), _) => UiEvent::Command(Command::Download),
            (KeyCode::Char('W'), _) => UiEvent::Command(Command::OpenWebsite),
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => UiEvent::Quit,
            _ => UiEvent::None,
        }
    }

    fn map_key_page_input(&mut self, key: KeyEvent) -> UiEvent {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => UiEvent::Quit,
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.page_buffer.len() < Self::MAX_PAGE_DIGITS {
                    self.page_buffer.push(c);
                }
                UiEvent::PageInputChanged
            }
            KeyCode::Backspace => {
                self.page_buffer.pop();
                if self.page_buffer.is_empty() {
                    self.mode = InputMode::Normal;
                }
                UiEvent::PageInputChanged
            }
            KeyCode::Enter => {
                let raw = std::mem::take(&mut self.page_buffer);
                self.mode = InputMode::Normal;
                UiEvent::Command(Command::PageInput { raw })
            }
            KeyCode::Esc => {
                self.page_buffer.clear();
                self.mode = InputMode::Normal;
                UiEvent::PageInputChanged
            }
            _ => UiEvent::None,
        }
    }

    fn map_mouse(&mut self, mouse: MouseEvent) -> UiEvent {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.scroll(self.scroll_step),
            MouseEventKind::ScrollUp => self.scroll(-self.scroll_step),
            _ => UiEvent::None,
        }
    }

    fn scroll(&self, delta: f32) -> UiEvent {
        UiEvent::Command(Command::ScrollBy { delta })
    }
}

pub fn write_status_line<W: Write>(writer: &mut W, label: &str) -> io::Result<()> {
    write!(writer, "{}", label)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    #[test]
    fn kitty_draw_emits_protocol() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let image = RenderImage {
            width: 1,
            height: 1,
            pixels: vec![255, 0, 0, 255],
        };

        renderer.draw(&image, DrawParams::clamped(10, 5)).unwrap();
        let output = String::from_utf8(renderer.writer.clone()).unwrap();
        assert!(output.starts_with("\u{1b}_Ga=T,f=100,C=1,q=2,i=1,p=1,c=10,r=5,z=-1,m=0;"));
        assert!(output.ends_with("\u{1b}\\"));
    }

    #[test]
    fn large_frames_are_chunked() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let mut seed: u32 = 0x2545_f491;
        let pixels: Vec<u8> = (0..64 * 64 * 4)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (seed >> 24) as u8
            })
            .collect();
        let image = RenderImage {
            width: 64,
            height: 64,
            pixels,
        };

        renderer.draw(&image, DrawParams::clamped(0, 0)).unwrap();
        let output = String::from_utf8(renderer.writer.clone()).unwrap();
        assert!(output.contains("c=1,r=1"));
        assert!(output.contains("m=1;"));
        assert!(output.contains("\u{1b}_Gm=0,q=2;"));
    }

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn scroll_event(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn event_mapper_maps_navigation_keys() {
        let mut mapper = EventMapper::new(10.0);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('n'))),
            UiEvent::Command(Command::NextPage)
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('p'))),
            UiEvent::Command(Command::PreviousPage)
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('G'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::LastPage)
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Home)),
            UiEvent::Command(Command::FirstPage)
        );
    }

    #[test]
    fn event_mapper_scrolls_by_step() {
        let mut mapper = EventMapper::new(10.0);
        mapper.set_page_step(300.0);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('j'))),
            UiEvent::Command(Command::ScrollBy { delta: 10.0 })
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Up)),
            UiEvent::Command(Command::ScrollBy { delta: -10.0 })
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::PageDown)),
            UiEvent::Command(Command::ScrollBy { delta: 300.0 })
        );
        assert_eq!(
            mapper.map_event(scroll_event(MouseEventKind::ScrollDown)),
            UiEvent::Command(Command::ScrollBy { delta: 10.0 })
        );
        assert_eq!(
            mapper.map_event(scroll_event(MouseEventKind::ScrollUp)),
            UiEvent::Command(Command::ScrollBy { delta: -10.0 })
        );
    }

    #[test]
    fn event_mapper_collects_page_number() {
        let mut mapper = EventMapper::default();
        assert!(mapper.pending_input().is_none());

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('1'))),
            UiEvent::PageInputChanged
        );
        mapper.map_event(key_event(KeyCode::Char('2')));
        assert_eq!(mapper.pending_input(), Some("12"));
        assert_eq!(mapper.mode(), InputMode::PageInput);

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('n'))),
            UiEvent::None
        );

        match mapper.map_event(key_event(KeyCode::Enter)) {
            UiEvent::Command(Command::PageInput { raw }) => assert_eq!(raw, "12"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(mapper.pending_input().is_none());
        assert_eq!(mapper.mode(), InputMode::Normal);
    }

    #[test]
    fn event_mapper_escape_discards_page_number() {
        let mut mapper = EventMapper::default();
        mapper.map_event(key_event(KeyCode::Char('4')));
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Esc)),
            UiEvent::PageInputChanged
        );
        assert!(mapper.pending_input().is_none());

        assert_eq!(mapper.map_event(key_event(KeyCode::Esc)), UiEvent::Quit);
    }

    #[test]
    fn event_mapper_backspace_leaves_input_when_empty() {
        let mut mapper = EventMapper::default();
        mapper.map_event(key_event(KeyCode::Char('9')));
        mapper.map_event(key_event(KeyCode::Backspace));
        assert_eq!(mapper.mode(), InputMode::Normal);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('j'))),
            UiEvent::Command(Command::ScrollBy {
                delta: EventMapper::DEFAULT_SCROLL_STEP
            })
        );
    }

    #[test]
    fn event_mapper_limits_page_digits() {
        let mut mapper = EventMapper::default();
        for _ in 0..8 {
            mapper.map_event(key_event(KeyCode::Char('9')));
        }
        assert_eq!(mapper.pending_input(), Some("9999"));
    }

    #[test]
    fn event_mapper_maps_actions_and_zoom() {
        let mut mapper = EventMapper::default();
        let cases = [
            (KeyCode::Char('+'), Command::ZoomIn),
            (KeyCode::Char('='), Command::ZoomIn),
            (KeyCode::Char('-'), Command::ZoomOut),
            (KeyCode::Char('P'), Command::Print),
            (KeyCode::Char('D'), Command::Download),
            (KeyCode::Char('W'), Command::OpenWebsite),
        ];
        for (code, expected) in cases {
            assert_eq!(
                mapper.map_event(key_event_with_modifiers(code, KeyModifiers::SHIFT)),
                UiEvent::Command(expected)
            );
        }
    }

    #[test]
    fn event_mapper_quits_on_ctrl_c_in_any_mode() {
        let mut mapper = EventMapper::default();
        let ctrl_c = key_event_with_modifiers(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(mapper.map_event(ctrl_c.clone()), UiEvent::Quit);
        mapper.map_event(key_event(KeyCode::Char('3')));
        assert_eq!(mapper.map_event(ctrl_c), UiEvent::Quit);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut mapper = EventMapper::default();
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('n'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(mapper.map_event(release), UiEvent::None);
    }
}
