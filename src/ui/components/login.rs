use eframe::egui;

pub fn render(ui: &mut egui::Ui, name_input: &mut String) -> Option<String> {
    let mut submit = false;
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() / 3.0);
        ui.heading("Anonymous Chat");
        ui.label("Pick a display name to start chatting.");
        ui.add_space(8.0);

        let response = ui.add(
            egui::TextEdit::singleline(name_input)
                .hint_text("Display name")
                .desired_width(240.0),
        );
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            submit = true;
        }
        if ui.button("Start Chatting").clicked() {
            submit = true;
        }
    });

    let name = name_input.trim();
    (submit && !name.is_empty()).then(|| name.to_string())
}
