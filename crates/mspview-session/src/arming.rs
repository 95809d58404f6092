//! INAV arming flag text.

/// Bit positions and the reason each one reports.
const ARMING_FLAGS: &[(u32, &str)] = &[
    (2, "Armed"),
    (3, "Was armed"),
    (4, "HITL"),
    (5, "SITL"),
    (6, "Geozone"),
    (7, "Failsafe"),
    (8, "Not level"),
    (9, "Calibrating"),
    (10, "Overloaded"),
    (11, "Navigation unsafe"),
    (12, "Compass not calibrated"),
    (13, "Accelerometer not calibrated"),
    (14, "Arm switch"),
    (15, "Hardware failure"),
    (16, "Failsafe box"),
    (17, "Kill switch"),
    (18, "RC link"),
    (19, "Throttle"),
    (20, "CLI"),
    (21, "CMS menu"),
    (22, "OSD menu"),
    (23, "Roll/pitch not centered"),
    (24, "Servo autotrim"),
    (25, "Out of memory"),
    (26, "Invalid setting"),
    (27, "PWM output error"),
    (28, "No prearm"),
    (29, "DShot beeper"),
    (30, "Landing detected"),
];

/// Reasons named by the set bits of `flags`, lowest bit first.
pub fn arming_reasons(flags: u32) -> Vec<&'static str> {
    ARMING_FLAGS
        .iter()
        .filter(|(bit, _)| flags & (1 << bit) != 0)
        .map(|(_, reason)| *reason)
        .collect()
}

/// Human-readable arming state. The raw value is always appended in hex;
/// bits without a known reason only show up there.
pub fn arming_text(flags: u32) -> String {
    if flags == 0 {
        return format!("Ready to arm ({flags:#x})");
    }
    let reasons = arming_reasons(flags);
    if reasons.is_empty() {
        format!("({flags:#x})")
    } else {
        format!("{} ({flags:#x})", reasons.join(", "))
    }
}
