use eframe::egui;

use crate::common::ChatId;
use crate::session::{ChatHeader, MessageView};

#[derive(Default)]
pub struct ChatAreaActions {
    pub back: bool,
    pub copy_group_link: Option<ChatId>,
}

pub fn render(
    ui: &mut egui::Ui,
    header: &ChatHeader,
    messages: &[MessageView],
) -> ChatAreaActions {
    let mut actions = ChatAreaActions::default();

    ui.horizontal(|ui| {
        if ui.button("<").on_hover_text("Back to chats").clicked() {
            actions.back = true;
        }
        ui.vertical(|ui| {
            ui.heading(&header.title);
            ui.label(egui::RichText::new(&header.status).weak());
        });
        if header.is_group {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Copy group link").clicked() {
                    actions.copy_group_link = Some(header.chat_id.clone());
                }
            });
        }
    });
    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .max_height(ui.available_height() - 36.0)
        .show(ui, |ui| {
            for message in messages {
                let layout = if message.own {
                    egui::Layout::right_to_left(egui::Align::TOP)
                } else {
                    egui::Layout::left_to_right(egui::Align::TOP)
                };
                ui.with_layout(layout, |ui| {
                    ui.vertical(|ui| {
                        if let Some(sender) = &message.sender {
                            ui.label(egui::RichText::new(sender).small().strong());
                        }
                        ui.label(&message.text);
                        ui.label(egui::RichText::new(&message.time).small().weak());
                    });
                });
            }
        });

    actions
}
