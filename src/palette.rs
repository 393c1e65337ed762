use rand::Rng as _;

use crate::foundation::core::Rgba8;

/// The fixed accent palette sampled by arrow/rectangle/line draws.
pub const BRIGHT_PALETTE: [Rgba8; 6] = [
    Rgba8::opaque(0xFF, 0xD6, 0x00), // #FFD600
    Rgba8::opaque(0x00, 0xE5, 0xFF), // #00E5FF
    Rgba8::opaque(0x69, 0xF0, 0xAE), // #69F0AE
    Rgba8::opaque(0xFF, 0x40, 0x81), // #FF4081
    Rgba8::opaque(0xFF, 0xAB, 0x40), // #FFAB40
    Rgba8::opaque(0xFF, 0xFF, 0x8D), // #FFFF8D
];

/// Accent color selection strategy.
///
/// Accent shapes sample one color per draw call, not per instruction
/// identity, so a redraw may legitimately recolor the same instruction.
/// Substituting a deterministic picker makes redraws pixel-identical.
pub trait ColorPicker {
    /// Pick the accent color for one draw call.
    fn pick(&mut self) -> Rgba8;
}

/// Default picker: uniform-random over [`BRIGHT_PALETTE`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPicker;

impl ColorPicker for RandomPicker {
    fn pick(&mut self) -> Rgba8 {
        let i = rand::thread_rng().gen_range(0..BRIGHT_PALETTE.len());
        BRIGHT_PALETTE[i]
    }
}

/// Deterministic picker that cycles the palette in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct CyclingPicker {
    next: usize,
}

impl ColorPicker for CyclingPicker {
    fn pick(&mut self) -> Rgba8 {
        let c = BRIGHT_PALETTE[self.next % BRIGHT_PALETTE.len()];
        self.next += 1;
        c
    }
}

/// Deterministic picker that always returns one fixed color.
#[derive(Clone, Copy, Debug)]
pub struct FixedPicker(pub Rgba8);

impl ColorPicker for FixedPicker {
    fn pick(&mut self) -> Rgba8 {
        self.0
    }
}

/// Parse a `#RRGGBB` or `#RRGGBBAA` hex color (leading `#` optional).
pub fn parse_hex(s: &str) -> Result<Rgba8, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    // Byte-offset slicing below requires single-byte chars.
    if !s.is_ascii() {
        return Err("hex color must be ASCII".to_owned());
    }

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    match s.len() {
        6 => Ok(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: 255,
        }),
        8 => Ok(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned()),
    }
}

/// Parse an optional instruction color field, falling back on absence,
/// the literal `"none"`, or an unparseable value.
///
/// Unparseable values log a warning; the routine's default wins.
pub(crate) fn color_or(field: Option<&str>, default: Rgba8) -> Rgba8 {
    let Some(s) = field else {
        return default;
    };
    if s == "none" {
        return default;
    }
    match parse_hex(s) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(color = s, error = %e, "unparseable color, using default");
            default
        }
    }
}
