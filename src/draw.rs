// Window + software drawing utilities.
// Visual effects provided here:
// 1) A "Video" window with the live frame and the tracked ellipse on top.
// 2) The selection rectangle while you drag, and a crosshair at the mouse.
// 3) A tiny 5x7 bitmap font for the HUD line (selection state + FPS).
// 4) Optional "ROI" and "BackProjection" windows showing what the tracker sees.

use std::time::{Duration, Instant};

use log::{debug, info};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::{Error, Result};
use crate::pipeline::{DisplaySink, UserInput};
use crate::selection::{PointerEvent, PointerKind, SelectionState};
use crate::session::{FrameReport, TrackStatus, TrackingSession};
use crate::types::{FrameBuffer, SelectionRect, TrackEllipse};
use crate::vision::{gray_to_frame, hsv_to_false_color};

pub const ELLIPSE_COLOR: u32 = 0x00_FF_00_00;
pub const ELLIPSE_STROKE: i32 = 2;
const SELECTION_COLOR: u32 = 0x00_FF_CC_33;
const HUD_COLOR: u32 = 0x00_FF_FF_FF;

/// Pointer events coming out of the main window carry its title as context.
pub const VIDEO_WINDOW: &str = "Video";

pub struct Drawer {
    window: Window, // the on-screen window you see
    screen: FrameBuffer,
    roi_window: Option<Window>,
    back_window: Option<Window>,
    diagnostics: bool,
    fps: usize,
    left_was_down: bool,
    last_pos: (i32, i32),
    fps_meter: FpsMeter,
}

impl Drawer {
    /// Create the main window sized to the stream, refreshing at `fps`.
    /// With `diagnostics`, the ROI / BackProjection windows open once there is
    /// a model to show.
    pub fn new(width: usize, height: usize, fps: f64, diagnostics: bool) -> Result<Self> {
        let fps = fps.round().max(1.0) as usize;
        let window = open_window(VIDEO_WINDOW, width, height, fps)?;
        Ok(Self {
            window,
            screen: FrameBuffer::filled(width, height, 0),
            roi_window: None,
            back_window: None,
            diagnostics,
            fps,
            left_was_down: false,
            last_pos: (0, 0),
            fps_meter: FpsMeter::new(),
        })
    }

    /// Current mouse position in frame pixels. Positions outside the window are
    /// passed through (possibly negative) so the selector can reject them.
    fn mouse_pos(&self) -> Option<(i32, i32)> {
        self.window
            .get_mouse_pos(MouseMode::Pass)
            .map(|(x, y)| (x.floor() as i32, y.floor() as i32))
    }

    fn show_diagnostics(&mut self, report: &FrameReport, session: &TrackingSession) -> Result<()> {
        if let Some(model) = session.model() {
            let roi = hsv_to_false_color(&model.roi);
            present_aux(&mut self.roi_window, "ROI", &roi, self.fps)?;
        }
        if let Some(back) = &report.back_projection {
            let img = gray_to_frame(back);
            present_aux(&mut self.back_window, "BackProjection", &img, self.fps)?;
        }
        Ok(())
    }
}

impl DisplaySink for Drawer {
    type Context = &'static str;

    fn poll_input(&mut self) -> Vec<UserInput<&'static str>> {
        let mut input = Vec::new();
        if !self.window.is_open() || self.window.is_key_down(Key::Escape) {
            input.push(UserInput::Stop);
            return input;
        }
        if self.window.is_key_pressed(Key::C, KeyRepeat::No) {
            input.push(UserInput::ClearSelection);
        }

        // minifb reports the button level; the selector wants edges.
        if let Some(pos) = self.mouse_pos() {
            self.last_pos = pos;
        }
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down != self.left_was_down {
            let kind = if down { PointerKind::Down } else { PointerKind::Up };
            let (x, y) = self.last_pos;
            input.push(UserInput::Pointer(PointerEvent { kind, x, y, context: VIDEO_WINDOW }));
            self.left_was_down = down;
        }
        input
    }

    fn show(&mut self, frame: &FrameBuffer, report: &FrameReport, session: &TrackingSession) -> Result<()> {
        if self.screen.width != frame.width || self.screen.height != frame.height {
            self.screen = frame.clone();
        } else {
            self.screen.pixels.copy_from_slice(&frame.pixels);
        }

        if let Some(e) = &report.ellipse {
            draw_ellipse(&mut self.screen, e, ELLIPSE_COLOR, ELLIPSE_STROKE);
        }
        if let Some(rect) = session.selector().drag_preview(self.last_pos) {
            draw_rect(&mut self.screen, &rect, SELECTION_COLOR);
        }
        if let Some((mx, my)) = self.mouse_pos() {
            draw_crosshair(&mut self.screen, mx, my, 12, SELECTION_COLOR);
        }

        let hud = hud_text(report, &self.fps_meter.text);
        draw_text_5x7(&mut self.screen, 8, 8, &hud, HUD_COLOR);

        self.window
            .update_with_buffer(&self.screen.pixels, self.screen.width, self.screen.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;

        if self.diagnostics {
            self.show_diagnostics(report, session)?;
        }

        if let Some(fps) = self.fps_meter.tick() {
            debug!("display {fps:.1} fps");
        }
        Ok(())
    }
}

fn open_window(title: &str, width: usize, height: usize, fps: usize) -> Result<Window> {
    let mut window = Window::new(title, width.max(1), height.max(1), WindowOptions::default())
        .map_err(|e| Error::WindowInit(format!("{title}: {e}")))?;
    window.set_target_fps(fps);
    Ok(window)
}

/// Show `img` in an auxiliary window, (re)opening it when the image size
/// changes. A window the user closed stays closed.
fn present_aux(slot: &mut Option<Window>, title: &str, img: &FrameBuffer, fps: usize) -> Result<()> {
    if img.width == 0 || img.height == 0 {
        return Ok(());
    }
    let needs_new = match slot {
        Some(w) => w.get_size() != (img.width, img.height),
        None => true,
    };
    if needs_new {
        info!("opening {title} window {}x{}", img.width, img.height);
        *slot = Some(open_window(title, img.width, img.height, fps)?);
    }
    if let Some(w) = slot {
        if !w.is_open() {
            return Ok(());
        }
        w.update_with_buffer(&img.pixels, img.width, img.height)
            .map_err(|e| Error::WindowUpdate(format!("{title}: {e}")))?;
    }
    Ok(())
}

fn hud_text(report: &FrameReport, fps_text: &str) -> String {
    let status = match (report.state, report.status) {
        (_, TrackStatus::Skipped(_)) => "LOST",
        (SelectionState::Idle, _) => "IDLE | DRAG TO SELECT",
        (state, _) => state.label(),
    };
    format!("{status} | {fps_text}")
}

/// Frames shown per second, refreshed once a second.
struct FpsMeter {
    since: Instant,
    frames: u32,
    text: String,
}

impl FpsMeter {
    fn new() -> Self {
        Self { since: Instant::now(), frames: 0, text: String::from("FPS: 0.0") }
    }

    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.text = format!("FPS: {fps:.1}");
        self.frames = 0;
        self.since = Instant::now();
        Some(fps)
    }
}

/* ---------- Software drawing: pixels, lines, shapes, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// A `stroke` x `stroke` dot centered on (x,y).
#[inline]
fn put_dot(fb: &mut FrameBuffer, x: i32, y: i32, stroke: i32, color: u32) {
    let r0 = -(stroke - 1) / 2;
    for dy in r0..r0 + stroke.max(1) {
        for dx in r0..r0 + stroke.max(1) {
            put_pixel(fb, x + dx, y + dy, color);
        }
    }
}

/// Bresenham line between (x0,y0) and (x1,y1).
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, stroke: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_dot(fb, x0, y0, stroke, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Outline of an oriented ellipse, drawn as a closed polyline.
pub fn draw_ellipse(fb: &mut FrameBuffer, e: &TrackEllipse, color: u32, stroke: i32) {
    let a = e.major * 0.5;
    let b = e.minor * 0.5;
    let (sn, cs) = e.angle.to_radians().sin_cos();
    // Multiple of 4 so the axis end points are always vertices.
    let segments = (((a + b) * 0.5) as usize).clamp(6, 45) * 4;

    let point = |i: usize| {
        let t = i as f32 * std::f32::consts::TAU / segments as f32;
        let (st, ct) = t.sin_cos();
        let x = e.center.0 + a * ct * cs - b * st * sn;
        let y = e.center.1 + a * ct * sn + b * st * cs;
        (x.round() as i32, y.round() as i32)
    };

    let mut prev = point(0);
    for i in 1..=segments {
        let p = point(i);
        draw_line(fb, prev.0, prev.1, p.0, p.1, stroke, color);
        prev = p;
    }
}

/// One-pixel outline of a selection rectangle (right/bottom exclusive).
pub fn draw_rect(fb: &mut FrameBuffer, r: &SelectionRect, color: u32) {
    let (x1, y1) = (r.right - 1, r.bottom - 1);
    draw_line(fb, r.left, r.top, x1, r.top, 1, color);
    draw_line(fb, x1, r.top, x1, y1, 1, color);
    draw_line(fb, x1, y1, r.left, y1, 1, color);
    draw_line(fb, r.left, y1, r.left, r.top, 1, color);
}

/// Draw a small crosshair centered at (cx,cy), with a gap in the middle.
pub fn draw_crosshair(fb: &mut FrameBuffer, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(fb, cx - size, cy, cx - 2, cy, 1, color);
    draw_line(fb, cx + 2, cy, cx + size, cy, 1, color);
    draw_line(fb, cx, cy - size, cx, cy - 2, 1, color);
    draw_line(fb, cx, cy + 2, cx, cy + size, 1, color);
    put_pixel(fb, cx, cy, color);
}

/* ---------- 5x7 bitmap font (just the characters the HUD uses) ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // State names, "LOST", "DRAG TO SELECT", "FPS"
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'N' => g!(0b10001,0b11001,0b10101,0b10011,0b10001,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        for (shadow, c) in [(1, 0x00000000), (0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx + shadow, y + ry as i32 + shadow, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs, 1 pixel apart.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}
