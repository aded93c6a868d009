use eframe::egui;

use crate::common::ChatId;
use crate::ui::state::AppState;

#[derive(Default)]
pub struct SidebarActions {
    pub select_chat: Option<ChatId>,
    pub new_group: bool,
    pub copy_invite: bool,
    pub open_link: Option<String>,
    pub retry_link: bool,
    pub sign_out: bool,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> SidebarActions {
    let mut actions = SidebarActions::default();

    if let Some(user) = &state.user {
        ui.horizontal(|ui| {
            ui.strong(&user.display_name);
            if ui.small_button("Sign out").clicked() {
                actions.sign_out = true;
            }
        });
    }
    ui.horizontal(|ui| {
        if ui.button("Copy invite link").clicked() {
            actions.copy_invite = true;
        }
        if ui.button("New group").clicked() {
            actions.new_group = true;
        }
    });

    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.link_input)
                .hint_text("Paste an invite link")
                .desired_width(ui.available_width() - 50.0),
        );
        if ui.button("Open").clicked() && !state.link_input.trim().is_empty() {
            actions.open_link = Some(std::mem::take(&mut state.link_input));
        }
    });

    if state.pending_link.is_some() {
        ui.horizontal(|ui| {
            ui.colored_label(egui::Color32::YELLOW, "Invite not opened yet");
            if ui.small_button("Retry invite").clicked() {
                actions.retry_link = true;
            }
        });
    }

    ui.separator();
    ui.heading("Chats");

    if state.chats.is_empty() {
        ui.label(egui::RichText::new("No chats yet. Share your invite link!").weak());
        return actions;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for entry in &state.chats {
                let kind = if entry.is_group { "#" } else { "@" };
                let label = format!("{} {kind} {}\n{}", entry.avatar, entry.title, entry.preview);
                if ui.selectable_label(entry.active, label).clicked() && !entry.active {
                    actions.select_chat = Some(entry.chat_id.clone());
                }
            }
        });

    actions
}
