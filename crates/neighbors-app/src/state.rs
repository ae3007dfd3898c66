// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub show_ignored: bool,
    pub help_visible: bool,
    pub status_line: Option<String>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            show_ignored: true,
            help_visible: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCommand {
    ToggleIgnoredVisibility,
    ShowHelp,
    HideHelp,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    IgnoredVisibilityChanged(bool),
    HelpVisibilityChanged(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl PageState {
    pub fn dispatch(&mut self, command: PageCommand) -> Vec<PageEvent> {
        match command {
            PageCommand::ToggleIgnoredVisibility => {
                self.show_ignored = !self.show_ignored;
                let label = if self.show_ignored {
                    "ignored shown"
                } else {
                    "ignored hidden"
                };
                vec![
                    PageEvent::IgnoredVisibilityChanged(self.show_ignored),
                    self.set_status(label),
                ]
            }
            PageCommand::ShowHelp => {
                self.help_visible = true;
                vec![PageEvent::HelpVisibilityChanged(true)]
            }
            PageCommand::HideHelp => {
                self.help_visible = false;
                vec![PageEvent::HelpVisibilityChanged(false)]
            }
            PageCommand::SetStatus(message) => vec![self.set_status(&message)],
            PageCommand::ClearStatus => {
                self.status_line = None;
                vec![PageEvent::StatusCleared]
            }
        }
    }

    fn set_status(&mut self, message: &str) -> PageEvent {
        self.status_line = Some(message.to_owned());
        PageEvent::StatusUpdated(message.to_owned())
    }
}
