use imgui::Context;

/// Apply the light or dark style to the imgui context.
///
/// Called outside the frame, whenever the night-mode setting flips.
pub fn apply_theme(imgui: &mut Context, dark: bool) {
    let style = imgui.style_mut();
    if dark {
        style.use_dark_colors();
    } else {
        style.use_light_colors();
    }
}
