use chipvm_core::Display;

/// A key index (0..16) changing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: usize,
    pub pressed: bool,
}

/// The presentation side of the driver loop: it shows frames, plays the
/// tone and reports input.
pub trait Frontend {
    fn init(&mut self) {}
    /// Key changes since the last poll, already mapped to keypad indices.
    fn poll_events(&mut self) -> Vec<KeyEvent>;
    fn present(&mut self, display: &Display);
    fn set_tone(&mut self, playing: bool);
    fn should_exit(&self) -> bool;
    fn exit(&mut self) {}
}

/// Frontend with no window and no input. Keeps the last frame as text.
#[derive(Debug, Default)]
pub struct HeadlessFrontend {
    scale: usize,
    frames: u64,
    tone_frames: u64,
    last_frame: Option<String>,
}

impl HeadlessFrontend {
    pub fn new(scale: usize) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames presented while the tone was on.
    pub fn tone_frames(&self) -> u64 {
        self.tone_frames
    }

    pub fn last_frame(&self) -> Option<&str> {
        self.last_frame.as_deref()
    }
}

impl Frontend for HeadlessFrontend {
    fn init(&mut self) {
        log::info!("headless frontend init");
    }

    fn poll_events(&mut self) -> Vec<KeyEvent> {
        Vec::new()
    }

    fn present(&mut self, display: &Display) {
        self.frames += 1;
        self.last_frame = Some(display.render_text(self.scale));
    }

    fn set_tone(&mut self, playing: bool) {
        if playing {
            self.tone_frames += 1;
        }
    }

    fn should_exit(&self) -> bool {
        false
    }

    fn exit(&mut self) {
        log::info!(
            "headless frontend exit after {} frames ({} with tone)",
            self.frames,
            self.tone_frames
        );
    }
}
