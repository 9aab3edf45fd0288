//! Sunset gradient ASCII banner (ROAD WALLET).
//! Uses figlet's bundled standard font.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Desert orange (#ff8c42).
const DESERT_ORANGE: (u8, u8, u8) = (0xff, 0x8c, 0x42);
/// Dusk violet (#7b2cbf).
const DUSK_VIOLET: (u8, u8, u8) = (0x7b, 0x2c, 0xbf);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

fn banner_art() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("ROAD WALLET").map(|figure| figure.to_string()))
        .unwrap_or_else(|| "ROAD WALLET".to_string())
}

/// Prints the welcome banner with an orange-to-violet gradient, then the version.
pub fn print_welcome() {
    let mut out = stdout();
    let art = banner_art();
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(DESERT_ORANGE, DUSK_VIOLET, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: DESERT_ORANGE.0,
        g: DESERT_ORANGE.1,
        b: DESERT_ORANGE.2,
    }));
    let _ = out.execute(Print(format!("v{}  shared trip expenses\r\n", version)));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}
