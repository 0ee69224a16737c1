use super::{App, Screen, SliderFocus, pasted_path};
use crate::action::Action;

impl App {
    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        // Quit confirmation modal: q confirms, Esc cancels
        if self.confirm_quit {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::NavigateBack => {
                    self.confirm_quit = false;
                }
                Action::Tick => {
                    self.tick = self.tick.wrapping_add(1);
                }
                Action::Resize(w, h) => self.resize(w, h),
                _ => {}
            }
            return false;
        }

        // Help overlay closes on ?, Esc or q
        if self.show_help {
            match action {
                Action::ToggleHelp | Action::NavigateBack | Action::Quit => {
                    self.show_help = false;
                }
                Action::Tick => {
                    self.tick = self.tick.wrapping_add(1);
                }
                Action::Resize(w, h) => self.resize(w, h),
                _ => {}
            }
            return false;
        }

        match action {
            Action::Quit => {
                // Ask whenever a document is open or speech is live
                if self.session.has_text()
                    || self.session.controller().current_session().is_some()
                {
                    self.confirm_quit = true;
                } else {
                    self.should_quit = true;
                }
            }
            Action::ToggleHelp => {
                self.show_help = true;
            }
            Action::Paste(text) => {
                if let Some(path) = pasted_path(&text) {
                    self.screen = Screen::Reader;
                    self.open_file(path);
                }
            }
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            Action::Resize(w, h) => self.resize(w, h),
            other => match self.screen {
                Screen::Reader => self.handle_reader_action(other),
                Screen::FilePicker => self.handle_file_picker_action(other),
            },
        }

        self.should_quit
    }

    fn handle_reader_action(&mut self, action: Action) {
        // Buttons that are disabled do nothing
        let controls = self.session.controls();
        match action {
            Action::Play if controls.play => self.session.play(),
            Action::Pause if controls.pause => self.session.pause(),
            Action::Stop if controls.stop => self.session.stop(),
            Action::CycleSlider => {
                self.focus = match self.focus {
                    SliderFocus::Rate => SliderFocus::Pitch,
                    SliderFocus::Pitch => SliderFocus::Rate,
                };
            }
            Action::Increase => self.focused_slider(1),
            Action::Decrease => self.focused_slider(-1),
            Action::MoveDown => self.scroll_preview_to(self.preview_scroll.saturating_add(1)),
            Action::MoveUp => self.scroll_preview_to(self.preview_scroll.saturating_sub(1)),
            Action::PageDown => {
                let page = self.visible_rows.max(1) as u16;
                self.scroll_preview_to(self.preview_scroll.saturating_add(page));
            }
            Action::PageUp => {
                let page = self.visible_rows.max(1) as u16;
                self.scroll_preview_to(self.preview_scroll.saturating_sub(page));
            }
            Action::GoTop => self.scroll_preview_to(0),
            Action::GoBottom => self.scroll_preview_to(u16::MAX),
            Action::OpenFilePicker => {
                self.file_picker.refresh_entries();
                self.screen = Screen::FilePicker;
            }
            _ => {}
        }
    }

    /// Slider changes apply at the next Play, never to the live utterance.
    fn focused_slider(&mut self, steps: i32) {
        let slider = match self.focus {
            SliderFocus::Rate => &mut self.session.rate,
            SliderFocus::Pitch => &mut self.session.pitch,
        };
        slider.step_by(steps);
    }

    fn resize(&mut self, width: u16, height: u16) {
        // Everything but the preview body takes ten rows; its border takes two columns
        self.visible_rows = (height as usize).saturating_sub(10);
        self.preview_width = width.saturating_sub(2);
        self.scroll_preview_to(self.preview_scroll);
    }

    fn scroll_preview_to(&mut self, line: u16) {
        self.preview_scroll = line.min(self.max_preview_scroll());
    }

    fn max_preview_scroll(&self) -> u16 {
        let lines = self
            .session
            .preview()
            .map(|p| crate::view::wrapped_height(p, self.preview_width))
            .unwrap_or(0);
        let max = lines.saturating_sub(self.visible_rows.max(1));
        u16::try_from(max).unwrap_or(u16::MAX)
    }
}
