/// What the movement worker does for one processed sensor pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Maneuver {
    /// Both sides clear: keep driving forward.
    Forward,
    /// Left blocked: back off, then pivot right.
    AvoidRight,
    /// Right blocked: back off, then pivot left.
    AvoidLeft,
    /// Both blocked: back off, then a harder right pivot.
    AvoidBoth,
}

impl Maneuver {
    pub fn label(self) -> &'static str {
        match self {
            Maneuver::Forward => "forward",
            Maneuver::AvoidRight => "avoid_right",
            Maneuver::AvoidLeft => "avoid_left",
            Maneuver::AvoidBoth => "avoid_both",
        }
    }
}

/// Map a debounced IR pair (`true` = clear) to a maneuver.
pub fn decide_motion(left_clear: bool, right_clear: bool) -> Maneuver {
    match (left_clear, right_clear) {
        (true, true) => Maneuver::Forward,
        (false, true) => Maneuver::AvoidRight,
        (true, false) => Maneuver::AvoidLeft,
        (false, false) => Maneuver::AvoidBoth,
    }
}
