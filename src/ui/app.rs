use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{ChatCommand, ChatEvent, NoticeLevel};

use super::components::{
    chat_area::{self, ChatAreaActions},
    group_dialog, input_bar, login,
    sidebar::{self, SidebarActions},
};
use super::state::{AppState, TOAST_DURATION};

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<ChatCommand>,
    event_receiver: mpsc::Receiver<ChatEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<ChatCommand>,
        event_receiver: mpsc::Receiver<ChatEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_client_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.event_receiver.try_recv() {
            if let ChatEvent::LinkReady(link) = &event {
                ctx.copy_text(link.clone());
                ctx.request_repaint_after(TOAST_DURATION);
            }
            self.state.apply(event);
        }
    }

    fn send_command(&mut self, command: ChatCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to client: {err}");
        }
    }

    fn apply_sidebar(&mut self, actions: SidebarActions) {
        if let Some(chat_id) = actions.select_chat {
            self.send_command(ChatCommand::SelectChat(chat_id));
        }
        if actions.new_group {
            self.state.group_dialog_open = true;
        }
        if actions.copy_invite {
            self.send_command(ChatCommand::CopyInviteLink);
        }
        if let Some(link) = actions.open_link {
            self.send_command(ChatCommand::OpenLink(link));
        }
        if actions.retry_link {
            self.send_command(ChatCommand::RetryLink);
        }
        if actions.sign_out {
            self.send_command(ChatCommand::SignOut);
        }
    }

    fn apply_chat_area(&mut self, actions: ChatAreaActions) {
        if actions.back {
            self.send_command(ChatCommand::CloseChat);
        }
        if let Some(chat_id) = actions.copy_group_link {
            self.send_command(ChatCommand::CopyGroupLink(chat_id));
        }
    }

    fn render_notices(&mut self, ui: &mut egui::Ui) {
        let mut dismissed = None;
        for (index, notice) in self.state.notices.iter().enumerate() {
            ui.horizontal(|ui| {
                let color = match notice.level {
                    NoticeLevel::Info => egui::Color32::LIGHT_BLUE,
                    NoticeLevel::Error => egui::Color32::LIGHT_RED,
                };
                ui.colored_label(color, &notice.text);
                if ui.small_button("x").clicked() {
                    dismissed = Some(index);
                }
            });
        }
        if let Some(index) = dismissed {
            self.state.notices.remove(index);
        }
    }

    fn render_toast(&self, ctx: &egui::Context) {
        if !self.state.toast_visible() {
            return;
        }
        egui::Area::new(egui::Id::new("link_toast"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -24.0])
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label("Link copied to clipboard!");
                });
            });
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_client_events(ctx);

        if !self.state.notices.is_empty() {
            egui::TopBottomPanel::top("notices").show(ctx, |ui| self.render_notices(ui));
        }

        if self.state.user.is_none() {
            egui::CentralPanel::default().show(ctx, |ui| {
                if let Some(link) = &self.state.pending_link {
                    ui.label(egui::RichText::new(format!("Sign in to open {link}")).weak());
                }
                if let Some(name) = login::render(ui, &mut self.state.name_input) {
                    self.send_command(ChatCommand::SignIn { display_name: name });
                }
            });
            ctx.request_repaint();
            return;
        }

        egui::SidePanel::left("chat_sidebar")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                let actions = sidebar::render(ui, &mut self.state);
                self.apply_sidebar(actions);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(header) = self.state.header.clone() else {
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new("Select a chat to start messaging").weak());
                });
                return;
            };

            let actions = chat_area::render(ui, &header, &self.state.messages);
            self.apply_chat_area(actions);

            ui.separator();
            if let Some(text) = input_bar::render(ui, &mut self.state.input_text) {
                self.send_command(ChatCommand::SendMessage {
                    chat_id: header.chat_id.clone(),
                    text,
                });
            }
        });

        if let Some(name) = group_dialog::render(
            ctx,
            &mut self.state.group_dialog_open,
            &mut self.state.group_name_input,
        ) {
            self.send_command(ChatCommand::CreateGroup { name });
        }

        self.render_toast(ctx);
        ctx.request_repaint();
    }
}
