use eframe::egui;

/// Modal-style window asking for a group name. Returns the name on confirm.
pub fn render(
    ctx: &egui::Context,
    open: &mut bool,
    name_input: &mut String,
) -> Option<String> {
    let mut confirmed = None;
    let mut close = false;

    egui::Window::new("New Group")
        .open(open)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.add(egui::TextEdit::singleline(name_input).hint_text("Group name"));
            ui.horizontal(|ui| {
                if ui.button("Create").clicked() && !name_input.trim().is_empty() {
                    confirmed = Some(name_input.trim().to_string());
                }
                if ui.button("Cancel").clicked() {
                    close = true;
                }
            });
        });

    if confirmed.is_some() || close {
        *open = false;
        name_input.clear();
    }
    confirmed
}
