//! G-code command emission with redundancy suppression
//!
//! Turns an ordered line of pixels into motion commands. Each token is only
//! written when its formatted value differs from the last one written for the
//! same letter, unless verbose output is enabled. The last-written values
//! live in [`CommandState`] and persist across lines for the whole run.

use crate::power::PowerMapper;
use crate::tiles::PowerSource;
use rasterkit_core::{PixelCoord, Result};
use rasterkit_settings::{DerivedSettings, Offsets, Precision, RasterSettings};

/// Command letters in the emitted vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Letter {
    G,
    X,
    Y,
    S,
}

impl Letter {
    const ALL: [Letter; 4] = [Letter::G, Letter::X, Letter::Y, Letter::S];

    fn index(self) -> usize {
        match self {
            Letter::G => 0,
            Letter::X => 1,
            Letter::Y => 2,
            Letter::S => 3,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::G => 'G',
            Letter::X => 'X',
            Letter::Y => 'Y',
            Letter::S => 'S',
        }
    }

    /// Letter of a token such as `X1.25`.
    pub fn of_token(token: &str) -> Option<Letter> {
        let first = token.chars().next()?;
        Letter::ALL.into_iter().find(|l| l.as_char() == first)
    }
}

/// Motion mode of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// `G0`, beam off
    Travel,
    /// `G1`, beam on
    Burn,
}

impl Motion {
    fn code(self) -> f64 {
        match self {
            Motion::Travel => 0.0,
            Motion::Burn => 1.0,
        }
    }
}

/// Last formatted value written for each letter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandState {
    last: [Option<String>; 4],
}

impl CommandState {
    pub fn last(&self, letter: Letter) -> Option<&str> {
        self.last[letter.index()].as_deref()
    }

    /// Motion mode of the most recent `G` token.
    pub fn last_motion(&self) -> Option<Motion> {
        match self.last(Letter::G) {
            Some("0") => Some(Motion::Travel),
            Some("1") => Some(Motion::Burn),
            _ => None,
        }
    }

    fn record(&mut self, letter: Letter, value: String) {
        self.last[letter.index()] = Some(value);
    }
}

/// Emitter configuration taken from the run settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterConfig {
    pub beam_size: f64,
    pub beam_offset: f64,
    pub offsets: Offsets,
    pub precision: Precision,
    pub burn_white: bool,
    pub verbose: bool,
    pub mapper: PowerMapper,
}

impl EmitterConfig {
    pub fn new(settings: &RasterSettings, derived: &DerivedSettings) -> Self {
        Self {
            beam_size: settings.beam_size,
            beam_offset: derived.beam_offset,
            offsets: settings.offsets,
            precision: settings.precision,
            burn_white: settings.burn_white,
            verbose: settings.verbose_g,
            mapper: PowerMapper::new(derived.beam_range),
        }
    }

    fn decimals(&self, letter: Letter) -> usize {
        match letter {
            Letter::G => 0,
            Letter::X => self.precision.x as usize,
            Letter::Y => self.precision.y as usize,
            Letter::S => self.precision.s as usize,
        }
    }
}

/// Builds command lines and owns the redundancy state of a run.
#[derive(Debug, Clone)]
pub struct CommandEmitter {
    config: EmitterConfig,
    state: CommandState,
}

impl CommandEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            config,
            state: CommandState::default(),
        }
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    /// Format `tokens` into one command, dropping unchanged tokens.
    ///
    /// Returns `None` when every token was suppressed.
    pub fn command(&mut self, tokens: &[(Letter, f64)]) -> Option<String> {
        let mut parts = Vec::with_capacity(tokens.len());

        for &(letter, value) in tokens {
            let formatted = to_fixed(value, self.config.decimals(letter));
            if self.config.verbose || self.state.last(letter) != Some(formatted.as_str()) {
                parts.push(format!("{}{}", letter.as_char(), formatted));
                self.state.record(letter, formatted);
            }
        }

        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn motion(&mut self, motion: Motion, x: f64, y: f64, power: f64) -> Option<String> {
        self.command(&[
            (Letter::G, motion.code()),
            (Letter::X, x),
            (Letter::Y, y),
            (Letter::S, power),
        ])
    }

    /// Machine position of the center of pixel `coord`, in millimeters.
    pub fn position(&self, coord: PixelCoord) -> (f64, f64) {
        let c = &self.config;
        (
            coord.x as f64 * c.beam_size + c.beam_offset + c.offsets.x,
            coord.y as f64 * c.beam_size + c.beam_offset + c.offsets.y,
        )
    }

    /// Emit the commands for one ordered line of pixels.
    ///
    /// The first pixel always gets a travel move with the beam off. White
    /// pixels become travel moves unless `burn_white` is set; every burn is
    /// preceded by a travel to the same point when the previous mode was
    /// travel. Returns `None` if nothing was written.
    pub fn emit<I, P>(&mut self, pixels: I, power: &P) -> Result<Option<String>>
    where
        I: IntoIterator<Item = PixelCoord>,
        P: PowerSource + ?Sized,
    {
        let mut gcode = Vec::new();

        for (i, coord) in pixels.into_iter().enumerate() {
            let raw = power.raw_power(coord)?;
            let (x, y) = self.position(coord);

            if i == 0 {
                gcode.extend(self.motion(Motion::Travel, x, y, 0.0));
            }

            if !self.config.burn_white && raw == 0.0 {
                if i > 0 {
                    gcode.extend(self.motion(Motion::Travel, x, y, 0.0));
                }
            } else {
                let mapped = self.config.mapper.map(raw);
                if self.state.last_motion() == Some(Motion::Travel) {
                    gcode.extend(self.motion(Motion::Travel, x, y, 0.0));
                }
                gcode.extend(self.motion(Motion::Burn, x, y, mapped));
            }
        }

        Ok((!gcode.is_empty()).then(|| gcode.join("\n")))
    }
}

/// Digits needed to print any finite `f64` exactly.
const EXACT_DIGITS: usize = 1074;

/// Fixed-point text for `value` with ties rounded away from zero.
///
/// The tie is decided on the exact binary value, so `0.125` prints as
/// `0.13` while `1.005`, stored just below, prints as `1.00`.
pub fn to_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let exact = format!("{:.*}", EXACT_DIGITS, value.abs());
    let (int, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut digits: Vec<u8> = int
        .bytes()
        .chain(frac.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .collect();

    if frac.as_bytes().get(decimals).is_some_and(|&d| d >= b'5') {
        round_up(&mut digits);
    }

    let split = digits.len() - decimals;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|&d| d as char));
    if decimals > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|&d| d as char));
    }
    out
}

/// Add one unit in the last place of a decimal digit string.
fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}
