// Click commands - Communication host → audio callback

/// Which synthesized cue to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickKind {
    /// Bar-start accent, higher of the two accent pitches
    AccentHigh,
    /// Bar-start accent, lower of the two accent pitches
    AccentLow,
    /// Quarter-note tick
    Tick,
    /// Pattern hit acknowledgment
    Blip,
}

impl ClickKind {
    pub fn is_accent(self) -> bool {
        matches!(self, ClickKind::AccentHigh | ClickKind::AccentLow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickCommand {
    pub kind: ClickKind,
    /// Output gain (0.0 to 1.0)
    pub gain: f32,
}

impl ClickCommand {
    pub fn new(kind: ClickKind, gain: f32) -> Self {
        Self {
            kind,
            gain: gain.clamp(0.0, 1.0),
        }
    }
}
