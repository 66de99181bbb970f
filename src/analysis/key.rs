//! Key estimation by template correlation, and the Camelot wheel mapping.
//!
//! The chroma vector is rotated to each of the 12 roots and correlated against the
//! Krumhansl-Schmuckler major and minor profiles. The best of the 24 candidates wins,
//! with the first candidate encountered kept on ties (roots C..B, major before minor).

use std::fmt;

use super::chroma::ChromaVector;

/// Krumhansl-Schmuckler major profile, index 0 = tonic
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
/// Krumhansl-Schmuckler minor profile, index 0 = tonic
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

const NOTE_NAMES: [&str; 12] = [
    "C", "C♯", "D", "E♭", "E", "F", "F♯", "G", "A♭", "A", "B♭", "B",
];
const CAMELOT_MAJOR: [&str; 12] = [
    "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
];
const CAMELOT_MINOR: [&str; 12] = [
    "5A", "12A", "7A", "2A", "9A", "4A", "11A", "6A", "1A", "8A", "3A", "10A",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn profile(self) -> &'static [f32; 12] {
        match self {
            Mode::Major => &MAJOR_PROFILE,
            Mode::Minor => &MINOR_PROFILE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }
}

/// One of the 24 (root, mode) keys. `root` is a pitch class, 0 = C.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    root: u8,
    mode: Mode,
}

impl Key {
    pub fn new(root: usize, mode: Mode) -> Self {
        Self {
            root: (root % 12) as u8,
            mode,
        }
    }

    pub fn root(self) -> usize {
        self.root as usize
    }

    pub fn mode(self) -> Mode {
        self.mode
    }

    /// All 24 keys in estimation order.
    pub fn all() -> impl Iterator<Item = Key> {
        (0..12).flat_map(|root| [Key::new(root, Mode::Major), Key::new(root, Mode::Minor)])
    }

    pub fn note_name(self) -> &'static str {
        NOTE_NAMES[self.root()]
    }

    /// "<note> major" or "<note> minor"
    pub fn label(self) -> String {
        self.to_string()
    }

    pub fn camelot(self) -> &'static str {
        match self.mode {
            Mode::Major => CAMELOT_MAJOR[self.root()],
            Mode::Minor => CAMELOT_MINOR[self.root()],
        }
    }

    pub fn from_camelot(code: &str) -> Option<Key> {
        let code = code.trim().to_ascii_uppercase();
        Key::all().find(|k| k.camelot() == code)
    }

    pub fn from_label(label: &str) -> Option<Key> {
        let label = label.trim();
        Key::all().find(|k| k.label() == label)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.note_name(), self.mode.as_str())
    }
}

/// Winning key and its correlation score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyEstimate {
    pub key: Key,
    pub correlation: f32,
}

/// Pearson correlation; 0 when either input has zero variance.
pub fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let n = 12.0f64;
    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())) as f32
}

/// Rotate so that index 0 holds the energy of `root`.
fn rotate(chroma: &ChromaVector, root: usize) -> [f32; 12] {
    let mut rotated = [0.0f32; 12];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = chroma.0[(i + root) % 12];
    }
    rotated
}

/// Best-correlating key over all 24 candidates. Always resolves to a key.
pub fn estimate(chroma: &ChromaVector) -> KeyEstimate {
    let mut best = KeyEstimate {
        key: Key::new(0, Mode::Major),
        correlation: f32::NEG_INFINITY,
    };

    for key in Key::all() {
        let corr = pearson(&rotate(chroma, key.root()), key.mode().profile());
        if corr > best.correlation {
            best = KeyEstimate {
                key,
                correlation: corr,
            };
        }
    }

    best
}
