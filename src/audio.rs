//! Terminal bell for triggered alerts.

use std::io::Write;
use std::time::Duration;

/// Beep pattern, by how many alerts fired at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSound {
    Single,
    Double,
    Triple,
}

impl AlertSound {
    /// Pattern for `fired` newly triggered alerts, if any.
    pub fn for_count(fired: usize) -> Option<Self> {
        match fired {
            0 => None,
            1 => Some(AlertSound::Single),
            2 => Some(AlertSound::Double),
            _ => Some(AlertSound::Triple),
        }
    }

    fn beeps(self) -> usize {
        match self {
            AlertSound::Single => 1,
            AlertSound::Double => 2,
            AlertSound::Triple => 3,
        }
    }
}

/// Ring the terminal bell (BEL) the pattern's number of times.
pub fn play_sound(sound: AlertSound) {
    let mut stdout = std::io::stdout();
    for _ in 0..sound.beeps() {
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
        std::thread::sleep(Duration::from_millis(200));
    }
}

/// Ring without blocking the caller.
pub fn play_sound_async(sound: AlertSound) {
    std::thread::spawn(move || play_sound(sound));
}
