//! Icon affordances the core drives.
//!
//! The engine never draws anything, but it owns the *state* behind two
//! icons: the save button (floppy at rest, spinner while a save is in
//! flight) and the per-fragment audio playback button (spinner until the
//! audio source is loaded, then play/pause). Out-of-state requests are
//! ignored, which is what debounces double-clicks.

/// Save-button icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveIcon {
    Floppy,
    Spinner,
}

/// State machine behind the save button.
#[derive(Debug, Default)]
pub struct SaveControl {
    busy: bool,
}

impl SaveControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a save action. Returns `false` (and changes nothing) if a
    /// save is already showing as in flight.
    pub fn begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    /// Restore the resting icon. Called on every terminal outcome, success
    /// or failure.
    pub fn restore(&mut self) {
        self.busy = false;
    }

    pub fn icon(&self) -> SaveIcon {
        if self.busy {
            SaveIcon::Spinner
        } else {
            SaveIcon::Floppy
        }
    }
}

/// A `[start, end]` time window into the audio source, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentWindow {
    pub start_ms: f64,
    pub end_ms: f64,
}

impl FragmentWindow {
    pub fn new(start_ms: f64, end_ms: f64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Playback-button icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackIcon {
    /// Source still loading — clicks are ignored.
    Loading,
    Play,
    Pause,
}

/// State machine behind one fragment's playback button. The engine only
/// reflects lifecycle events it receives from the audio collaborator; it
/// does not decode or play anything itself.
#[derive(Debug)]
pub struct PlaybackIndicator {
    icon: PlaybackIcon,
}

impl Default for PlaybackIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackIndicator {
    pub fn new() -> Self {
        Self {
            icon: PlaybackIcon::Loading,
        }
    }

    pub fn icon(&self) -> PlaybackIcon {
        self.icon
    }

    /// The audio source finished loading.
    pub fn loaded(&mut self) {
        if self.icon == PlaybackIcon::Loading {
            self.icon = PlaybackIcon::Play;
        }
    }

    /// Whether a play request should be forwarded to the collaborator.
    /// Only an at-rest button accepts one.
    pub fn accepts_play(&self) -> bool {
        self.icon == PlaybackIcon::Play
    }

    /// Playback actually started.
    pub fn started(&mut self) {
        if self.icon == PlaybackIcon::Play {
            self.icon = PlaybackIcon::Pause;
        }
    }

    /// Playback reached the end of the fragment.
    pub fn ended(&mut self) {
        if self.icon == PlaybackIcon::Pause {
            self.icon = PlaybackIcon::Play;
        }
    }
}
