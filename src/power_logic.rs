/// Decide whether the radio link is released when background time ends.
///
/// Either the user's power-saving setting or the platform's low-power mode
/// is enough; otherwise the link stays up for the next foreground session.
pub fn release_link_after_background(power_saving: bool, low_power_mode: bool) -> bool {
    power_saving || low_power_mode
}

/// Decide whether a background refresh is worth starting at all.
pub fn background_refresh_allowed(has_preferred_device: bool, low_power_mode: bool) -> bool {
    has_preferred_device && !low_power_mode
}
